//! 基于 reqwest 的 HTTP 数据源实现

use super::MailingApi;
use super::types::{
    CompatiblePage, CompatibleRequest, ListsResponse, MailingBatchRequest, MailingBatchResponse,
    MailingListFilter, MailingListResponse, MailingStatsFilter, MailingStatsResponse,
    RecordingFilter, RecordingsResponse, RowRecord,
};
use crate::config::ApiConfig;
use crate::error::{CallMetricsError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 远程 API 客户端
#[derive(Debug, Clone)]
pub struct HttpMailingApi {
    client: Client,
    base_url: String,
    config: ApiConfig,
}

impl HttpMailingApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 发送请求；非 2xx 状态转换为 [`CallMetricsError::Api`]
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("Erro desconhecido").to_string()
            });
            #[cfg(feature = "logging")]
            tracing::warn!("API 返回 HTTP {}: {}", status.as_u16(), message);
            return Err(CallMetricsError::Api { status: status.as_u16(), message });
        }

        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.build_url(path);
        #[cfg(feature = "logging")]
        tracing::debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        #[cfg(feature = "logging")]
        tracing::debug!("POST {}", url);

        self.send(self.client.post(&url).json(body)).await
    }
}

/// 从错误响应体中取出可读信息：JSON 中的 `error`/`message` 字段，否则原文
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message"] {
            if let Some(serde_json::Value::String(text)) = map.get(key) {
                return Some(text.clone());
            }
        }
    }
    Some(trimmed.to_string())
}

#[async_trait]
impl MailingApi for HttpMailingApi {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn upload_batch(&self, rows: &[RowRecord]) -> Result<MailingBatchResponse> {
        self.post_json(&self.config.upload_endpoint, &MailingBatchRequest { data: rows }).await
    }

    async fn list_mailings(&self, filter: &MailingListFilter) -> Result<MailingListResponse> {
        self.get(&self.config.mailings_endpoint, &filter.to_query()).await
    }

    async fn fetch_compatible_page(
        &self,
        mailings: &[String],
        page: u32,
        limit: u32,
    ) -> Result<CompatiblePage> {
        self.post_json(
            &self.config.compatible_endpoint,
            &CompatibleRequest { mailings, page, limit },
        )
        .await
    }

    async fn fetch_recordings(&self, filter: &RecordingFilter) -> Result<RecordingsResponse> {
        self.get(&self.config.recordings_endpoint, &filter.to_query()).await
    }

    async fn fetch_mailing_stats(
        &self,
        filter: &MailingStatsFilter,
    ) -> Result<MailingStatsResponse> {
        self.get(&self.config.mailing_stats_endpoint, &filter.to_query()).await
    }

    async fn fetch_lists(&self) -> Result<ListsResponse> {
        self.get(&self.config.lists_endpoint, &[]).await
    }
}
