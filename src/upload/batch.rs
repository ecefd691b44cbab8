//! 分批上传
//!
//! 把一个文件的所有行按固定大小切分为连续的批次，为每一行注入名单名称，
//! 然后严格按顺序发送：上一批的响应返回之前不会发送下一批。

use super::queue::ItemStats;
use crate::api::{MAILING_NAME_FIELD, MailingApi, RowRecord};
use crate::error::{CallMetricsError, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// 每个批次完成后的累计状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// 已完成的批次序号，从 1 开始
    pub chunk: usize,
    /// 批次总数
    pub chunks: usize,
    /// 已发送的行数
    pub processed_rows: usize,
    /// 总行数
    pub total_rows: usize,
    /// 累计统计
    pub stats: ItemStats,
    /// 累计进度 (0-100)
    pub progress: u8,
}

/// 计算累计进度：前 `parse_progress` 留给解析阶段，剩余部分按已发送行数线性分配
pub fn upload_progress(processed_rows: usize, total_rows: usize, parse_progress: u8) -> u8 {
    let parse_progress = parse_progress.min(100);
    if total_rows == 0 {
        return 100;
    }
    let processed = processed_rows.min(total_rows) as f64;
    let share = f64::from(100 - parse_progress);
    let value = f64::from(parse_progress) + (processed / total_rows as f64 * share).round();
    value.min(100.0) as u8
}

/// 各批次的大小，最后一批可能更小
pub fn chunk_sizes(total_rows: usize, batch_size: usize) -> Vec<usize> {
    let batch_size = batch_size.max(1);
    (0..total_rows)
        .step_by(batch_size)
        .map(|start| batch_size.min(total_rows - start))
        .collect()
}

/// 顺序分批上传器
pub struct BatchUploader<'a> {
    api: &'a dyn MailingApi,
    batch_size: usize,
    parse_progress: u8,
    cancel: Option<CancellationToken>,
}

impl<'a> BatchUploader<'a> {
    pub fn new(api: &'a dyn MailingApi, batch_size: usize, parse_progress: u8) -> Self {
        Self { api, batch_size: batch_size.max(1), parse_progress, cancel: None }
    }

    /// 在批次之间检查取消信号
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 上传所有行，每个批次成功后调用 `on_chunk`
    ///
    /// 任一批次失败即返回 [`CallMetricsError::Upload`]，已被服务端接受的批次不会回滚。
    pub async fn upload<F>(
        &self,
        rows: Vec<RowRecord>,
        mailing_name: &str,
        mut on_chunk: F,
    ) -> Result<ItemStats>
    where
        F: FnMut(ChunkProgress) -> Result<()>,
    {
        let total_rows = rows.len();
        let chunks = total_rows.div_ceil(self.batch_size);
        let mut stats = ItemStats::default();
        let mut processed_rows = 0;

        #[cfg(feature = "logging")]
        tracing::info!(
            "开始上传名单 {}: {} 行, {} 个批次 (每批 {} 行)",
            mailing_name,
            total_rows,
            chunks,
            self.batch_size
        );

        let mut rows = rows.into_iter();
        for chunk_index in 1..=chunks {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(CallMetricsError::Cancelled);
            }

            let chunk: Vec<RowRecord> = rows
                .by_ref()
                .take(self.batch_size)
                .map(|mut row| {
                    row.insert(
                        MAILING_NAME_FIELD.to_string(),
                        Value::String(mailing_name.to_string()),
                    );
                    row
                })
                .collect();

            let response = self.api.upload_batch(&chunk).await.map_err(|e| {
                CallMetricsError::upload_error(format!(
                    "批次 {chunk_index}/{chunks}: {}",
                    e.user_message()
                ))
            })?;

            stats.absorb(&response);
            processed_rows += chunk.len();

            #[cfg(feature = "logging")]
            tracing::debug!(
                "批次 {}/{} 完成: 新增 {}, 重复 {}",
                chunk_index,
                chunks,
                response.total_novos_malling,
                response.total_duplicados_logs
            );

            on_chunk(ChunkProgress {
                chunk: chunk_index,
                chunks,
                processed_rows,
                total_rows,
                stats,
                progress: upload_progress(processed_rows, total_rows, self.parse_progress),
            })?;
        }

        Ok(stats)
    }
}
