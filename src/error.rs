//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。
//! 远程调用的失败会在发起它的操作边界处被转换为本地状态（队列项 ERROR、
//! 空结果集或提示信息），不会继续向上传播。

/// 库统一的结果类型
pub type Result<T> = std::result::Result<T, CallMetricsError>;

/// 呼叫中心分析工具错误类型
#[derive(Debug, thiserror::Error)]
pub enum CallMetricsError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 编解码错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置文件解析错误
    #[error("配置解析错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// 配置文件序列化错误
    #[error("配置序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// CSV 读写错误
    #[error("CSV错误: {0}")]
    Csv(#[from] csv::Error),

    /// 网络传输错误（连接失败、超时、响应体无法读取等）
    #[error("网络传输错误: {0}")]
    Transport(#[from] reqwest::Error),

    /// 远程 API 返回了非 2xx 状态
    #[error("API错误 (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// 表格文件无法解码
    #[error("文件解析错误 ({file}): {message}")]
    Parse { file: String, message: String },

    /// 批次上传失败
    #[error("上传错误: {message}")]
    Upload { message: String },

    /// 导出结果为空
    #[error("所选名单没有找到兼容数据")]
    NoData,

    /// 导出过程中失败
    #[error("导出错误: {message}")]
    Export { message: String },

    /// 操作被取消
    #[error("操作已取消")]
    Cancelled,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 不允许的状态操作（队列处理中删除、重复启动等）
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 其他错误
    #[error("未知错误: {0}")]
    Other(String),
}

impl CallMetricsError {
    /// 创建一个文件解析错误
    pub fn parse_error<F: Into<String>, S: Into<String>>(file: F, message: S) -> Self {
        let file = file.into();
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("文件解析错误 {}: {}", file, message);
        }
        Self::Parse { file, message }
    }

    /// 创建一个上传错误
    pub fn upload_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("上传错误: {}", message);
        }
        Self::Upload { message }
    }

    /// 创建一个导出错误
    pub fn export_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("导出错误: {}", message);
        }
        Self::Export { message }
    }

    /// 创建一个“无数据”结果，这是提示性结果而不是系统故障
    pub fn no_data() -> Self {
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::info!("导出完成但没有兼容数据");
        }
        Self::NoData
    }

    /// 创建一个配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("配置错误: {}", message);
        }
        Self::Config(message)
    }

    /// 创建一个状态错误
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::warn!("状态错误: {}", message);
        }
        Self::InvalidState(message)
    }

    /// 创建一个其他类型错误
    pub fn other<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("未知错误: {}", message);
        }
        Self::Other(message)
    }

    /// 面向用户的简短描述：API 错误只展示服务端返回的文本
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Upload { message } | Self::Export { message } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, CallMetricsError::Io(_))
    }

    /// 检查是否为文件解析错误
    pub fn is_parse_error(&self) -> bool {
        matches!(self, CallMetricsError::Parse { .. })
    }

    /// 检查是否为上传错误
    pub fn is_upload_error(&self) -> bool {
        matches!(self, CallMetricsError::Upload { .. })
    }

    /// 检查是否为“无数据”结果
    pub fn is_no_data(&self) -> bool {
        matches!(self, CallMetricsError::NoData)
    }

    /// 检查是否为导出错误
    pub fn is_export_error(&self) -> bool {
        matches!(self, CallMetricsError::Export { .. })
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CallMetricsError::Config(_)
                | CallMetricsError::TomlDe(_)
                | CallMetricsError::TomlSer(_)
        )
    }

    /// 检查是否为取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallMetricsError::Cancelled)
    }

    /// 检查是否为状态错误
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, CallMetricsError::InvalidState(_))
    }

    /// 检查是否为远程调用失败（传输层或非 2xx）
    pub fn is_remote_error(&self) -> bool {
        matches!(self, CallMetricsError::Transport(_) | CallMetricsError::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let parse_err = CallMetricsError::parse_error("a.xlsx", "corrupt");
        assert!(parse_err.is_parse_error());

        let upload_err = CallMetricsError::upload_error("HTTP 500");
        assert!(upload_err.is_upload_error());

        let config_err = CallMetricsError::config_error("missing base_url");
        assert!(config_err.is_config_error());
        assert!(!config_err.is_io_error());

        assert!(CallMetricsError::no_data().is_no_data());
    }

    #[test]
    fn test_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CallMetricsError = io_err.into();
        assert!(err.is_io_error());
    }

    #[test]
    fn test_error_display() {
        let err = CallMetricsError::Parse {
            file: "base.csv".to_string(),
            message: "bad header".to_string(),
        };

        let display = format!("{}", err);
        assert!(display.contains("base.csv"));
        assert!(display.contains("bad header"));
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = CallMetricsError::Api {
            status: 400,
            message: "mailing já existe".to_string(),
        };
        assert_eq!(err.user_message(), "mailing já existe");
        assert!(err.is_remote_error());

        let err = CallMetricsError::Api { status: 502, message: String::new() };
        assert!(err.user_message().contains("502"));
    }
}
