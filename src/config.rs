//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能。所有段都带有默认值，
//! 只写了部分字段的配置文件同样合法。

use crate::error::{CallMetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 主配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 日志配置
    pub log: LogSettings,
    /// 远程 API 配置
    pub api: ApiConfig,
    /// 名单上传配置
    pub upload: UploadSettings,
    /// 兼容数据导出配置
    pub export: ExportSettings,
    /// 面板查询配置
    pub dashboard: DashboardSettings,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// 是否启用控制台输出
    pub enable_stdout: bool,
    /// 日志输出目录
    pub log_dir: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            log_dir: "logs".to_string(),
            level: "info".to_string(),
        }
    }
}

/// 数据源类型，进程启动时根据配置选定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// 真实的远程 HTTP API
    #[default]
    Live,
    /// 内存中生成的模拟数据
    Mock,
}

impl std::str::FromStr for DataSourceKind {
    type Err = CallMetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "mock" => Ok(Self::Mock),
            other => Err(CallMetricsError::config_error(format!("未知的数据源: {other}"))),
        }
    }
}

/// 远程 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 服务根地址
    pub base_url: String,
    /// 通话录音列表
    pub recordings_endpoint: String,
    /// 名单批次上传
    pub upload_endpoint: String,
    /// 名单导入统计
    pub mailing_stats_endpoint: String,
    /// 名单名称列表
    pub mailings_endpoint: String,
    /// 兼容数据分页查询
    pub compatible_endpoint: String,
    /// 拨号列表名称
    pub lists_endpoint: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 数据源
    pub source: DataSourceKind,
    /// 模拟数据源每次调用的延迟（毫秒）
    pub mock_latency_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rotaportasdeaco.com:3060".to_string(),
            recordings_endpoint: "/gravacoes-todas".to_string(),
            upload_endpoint: "/subir-malling".to_string(),
            mailing_stats_endpoint: "/estatisticas-mailings".to_string(),
            mailings_endpoint: "/mailings".to_string(),
            compatible_endpoint: "/mailings-ceps-compativel".to_string(),
            lists_endpoint: "/listas".to_string(),
            timeout_secs: 60,
            source: DataSourceKind::Live,
            mock_latency_ms: 0,
        }
    }
}

/// 名单上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// 每个批次发送的行数
    pub batch_size: usize,
    /// 解析阶段占用的进度份额（百分比），其余份额按已上传行数线性分配
    pub parse_progress: u8,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self { batch_size: 500, parse_progress: 10 }
    }
}

/// 导出文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Excel 工作簿
    Xlsx,
    /// 逗号分隔文本
    Csv,
}

/// 未启用 Excel 导出时默认使用 CSV
impl Default for ArtifactFormat {
    fn default() -> Self {
        if cfg!(feature = "exporter-excel") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }
}

impl ArtifactFormat {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Xlsx => "xlsx",
            ArtifactFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = CallMetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(CallMetricsError::config_error(format!("不支持的导出格式: {other}"))),
        }
    }
}

/// 兼容数据导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// 每页请求的记录数（服务端允许的最大值为 5000）
    pub page_size: u32,
    /// 两次分页请求之间的停顿（毫秒）
    pub page_delay_ms: u64,
    /// 导出文件目录
    pub out_dir: String,
    /// 导出文件名前缀
    pub file_prefix: String,
    /// 导出格式
    pub format: ArtifactFormat,
    /// 工作表名称
    pub sheet_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: 5000,
            page_delay_ms: 100,
            out_dir: ".".to_string(),
            file_prefix: "Relatorio_Compativel_CEPs".to_string(),
            format: ArtifactFormat::default(),
            sheet_name: "Compatíveis".to_string(),
        }
    }
}

/// 面板查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// 通话列表每页条数
    pub page_size: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self { page_size: 15 }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// 从字符串加载配置
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 应用环境变量覆盖：`CALLMETRICS_API_URL`、`CALLMETRICS_DATA_SOURCE`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CALLMETRICS_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
        if let Ok(source) = std::env::var("CALLMETRICS_DATA_SOURCE") {
            self.api.source = source.parse()?;
        }
        self.validate()
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        match self.log.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(CallMetricsError::config_error(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        if self.api.source == DataSourceKind::Live
            && self.api.base_url.trim().is_empty()
        {
            return Err(CallMetricsError::config_error("base_url 不能为空"));
        }

        if self.upload.batch_size == 0 {
            return Err(CallMetricsError::config_error("batch_size 不能为0"));
        }

        if self.upload.parse_progress >= 100 {
            return Err(CallMetricsError::config_error("parse_progress 必须小于100"));
        }

        if self.export.page_size == 0 {
            return Err(CallMetricsError::config_error("export.page_size 不能为0"));
        }

        if self.dashboard.page_size == 0 {
            return Err(CallMetricsError::config_error("dashboard.page_size 不能为0"));
        }

        #[cfg(not(feature = "exporter-excel"))]
        if self.export.format == ArtifactFormat::Xlsx {
            return Err(CallMetricsError::config_error("未启用 exporter-excel 功能，无法导出 xlsx"));
        }

        Ok(())
    }
}
