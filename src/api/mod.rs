//! 远程数据源模块
//!
//! 面板需要的所有数据都通过 [`MailingApi`] 获取。真实 HTTP 服务与模拟数据
//! 是同一接口的两个实现，进程启动时由配置决定使用哪一个。

pub mod http;
pub mod mock;
pub mod types;

pub use http::HttpMailingApi;
pub use mock::MockMailingApi;
pub use types::{
    CompatiblePage, CompatibleRecord, Disposition, ListsResponse, MAILING_NAME_FIELD,
    MailingBatchResponse, MailingListFilter, MailingListResponse, MailingStat, MailingStatsFilter,
    MailingStatsResponse, PaginationMeta, Recording, RecordingFilter, RecordingsResponse,
    RowRecord,
};

use crate::config::{ApiConfig, DataSourceKind};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 面板数据源的统一接口
#[async_trait]
pub trait MailingApi: Send + Sync {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 上传一个批次的名单行（每行已注入名单名称）
    async fn upload_batch(&self, rows: &[RowRecord]) -> Result<MailingBatchResponse>;

    /// 查询名单名称列表
    async fn list_mailings(&self, filter: &MailingListFilter) -> Result<MailingListResponse>;

    /// 查询所选名单的兼容数据的一页，`page` 从 1 开始
    async fn fetch_compatible_page(
        &self,
        mailings: &[String],
        page: u32,
        limit: u32,
    ) -> Result<CompatiblePage>;

    /// 查询通话录音
    async fn fetch_recordings(&self, filter: &RecordingFilter) -> Result<RecordingsResponse>;

    /// 查询名单导入统计
    async fn fetch_mailing_stats(
        &self,
        filter: &MailingStatsFilter,
    ) -> Result<MailingStatsResponse>;

    /// 查询拨号列表名称
    async fn fetch_lists(&self) -> Result<ListsResponse>;
}

/// 根据配置构造数据源
pub fn build_api(config: &ApiConfig) -> Result<Arc<dyn MailingApi>> {
    match config.source {
        DataSourceKind::Live => {
            let api = HttpMailingApi::new(config.clone())?;
            #[cfg(feature = "logging")]
            tracing::info!("使用远程 API: {}", api.base_url());
            Ok(Arc::new(api))
        }
        DataSourceKind::Mock => {
            #[cfg(feature = "logging")]
            tracing::warn!("使用模拟数据源，配置 api.source = \"live\" 以连接真实 API");
            let latency = Duration::from_millis(config.mock_latency_ms);
            Ok(Arc::new(MockMailingApi::new().with_latency(latency)))
        }
    }
}
