//! 可比较名单的目录

use crate::api::{MailingApi, MailingListFilter};

/// 按名称和日期过滤加载名单列表；失败时返回空列表
pub async fn load_mailings(api: &dyn MailingApi, filter: &MailingListFilter) -> Vec<String> {
    match api.list_mailings(filter).await {
        Ok(response) if response.success => {
            #[cfg(feature = "logging")]
            tracing::debug!("加载到 {} 个名单", response.mailings.len());
            response.mailings
        }
        Ok(_response) => {
            #[cfg(feature = "logging")]
            tracing::warn!(
                "名单列表查询未成功: {}",
                _response.error.as_deref().unwrap_or("sem detalhes")
            );
            Vec::new()
        }
        Err(_e) => {
            #[cfg(feature = "logging")]
            tracing::error!("名单列表查询失败: {}", _e);
            Vec::new()
        }
    }
}
