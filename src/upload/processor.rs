//! 顺序队列处理
//!
//! 一轮处理开始时对 PENDING 项做快照，然后按加入顺序逐项处理，
//! 每一项完成（成功或失败）之后才开始下一项。单项失败不会中断整轮处理。

use super::batch::BatchUploader;
use super::queue::{ItemId, ItemStats, ItemStatus, QueueItem, UploadQueue};
use super::source::{SourceFile, read_rows};
use crate::api::MailingApi;
use crate::config::UploadSettings;
use crate::error::{CallMetricsError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// 处理过程中发送给观察者的事件
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    ItemStarted { id: ItemId, mailing_name: String },
    ItemProgress {
        id: ItemId,
        status: ItemStatus,
        progress: u8,
        processed_rows: usize,
        total_rows: Option<usize>,
    },
    ItemCompleted { id: ItemId, stats: ItemStats },
    ItemFailed { id: ItemId, message: String },
    RunFinished(RunReport),
}

/// 观察者通道
pub type QueueObserver = UnboundedSender<QueueEvent>;

/// 一轮处理的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// 到达终态的项数
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    /// 新增联系人合计
    pub novos: u64,
    /// 重复记录合计
    pub duplicados: u64,
}

/// 顺序队列处理器
pub struct QueueProcessor {
    api: Arc<dyn MailingApi>,
    settings: UploadSettings,
    observer: Option<QueueObserver>,
    cancel: Option<CancellationToken>,
}

impl QueueProcessor {
    pub fn new(api: Arc<dyn MailingApi>, settings: UploadSettings) -> Self {
        Self { api, settings, observer: None, cancel: None }
    }

    pub fn with_observer(mut self, observer: QueueObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(observer) = &self.observer {
            // 观察者已关闭时忽略
            let _ = observer.send(event);
        }
    }

    fn emit_progress(&self, item: &QueueItem) {
        self.emit(QueueEvent::ItemProgress {
            id: item.id(),
            status: item.status(),
            progress: item.progress(),
            processed_rows: item.processed_rows(),
            total_rows: item.total_rows(),
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// 处理本轮开始时所有 PENDING 的项
    pub async fn run(&self, queue: &UploadQueue) -> Result<RunReport> {
        let (_guard, pending) = queue.begin_run()?;
        let mut report = RunReport::default();

        #[cfg(feature = "logging")]
        let start_time = std::time::Instant::now();
        #[cfg(feature = "logging")]
        tracing::info!("开始处理上传队列: {} 个待处理文件", pending.len());

        for id in pending {
            if self.is_cancelled() {
                #[cfg(feature = "logging")]
                tracing::warn!("上传队列已取消，剩余文件保持等待状态");
                break;
            }

            match self.process_item(queue, id).await {
                Ok(stats) => {
                    report.completed += 1;
                    report.novos += stats.novos;
                    report.duplicados += stats.duplicados;
                    self.emit(QueueEvent::ItemCompleted { id, stats });
                }
                Err(e) if e.is_invalid_state() => {
                    // 项在快照之后已不可处理，跳过
                    continue;
                }
                Err(e) => {
                    let message = e.user_message();
                    let item = queue.update(id, |item| item.fail(message.clone()))?;
                    report.failed += 1;
                    report.novos += item.stats().novos;
                    report.duplicados += item.stats().duplicados;
                    self.emit(QueueEvent::ItemFailed { id, message });
                }
            }
            report.processed += 1;
        }

        #[cfg(feature = "logging")]
        tracing::info!(
            "上传队列处理结束: 完成 {}, 失败 {}, 新增 {}, 重复 {}, 耗时 {:?}",
            report.completed,
            report.failed,
            report.novos,
            report.duplicados,
            start_time.elapsed()
        );

        self.emit(QueueEvent::RunFinished(report));
        Ok(report)
    }

    async fn process_item(&self, queue: &UploadQueue, id: ItemId) -> Result<ItemStats> {
        let parse_progress = self.settings.parse_progress.min(99);

        // 名单名称在轮到该项时读取
        let (file, mailing_name) = queue.start_item(id, parse_progress / 2)?;
        self.emit(QueueEvent::ItemStarted { id, mailing_name: mailing_name.clone() });
        if let Some(item) = queue.get(id) {
            self.emit_progress(&item);
        }

        let result = self.upload_item(queue, id, &file, &mailing_name, parse_progress).await;
        // 解析或上传阶段的状态错误同样使该项失败
        result.map_err(|e| match e {
            CallMetricsError::InvalidState(message) => CallMetricsError::other(message),
            other => other,
        })
    }

    async fn upload_item(
        &self,
        queue: &UploadQueue,
        id: ItemId,
        file: &SourceFile,
        mailing_name: &str,
        parse_progress: u8,
    ) -> Result<ItemStats> {
        let rows = read_rows(file).await?;

        let item = queue.update(id, |item| item.begin_uploading(rows.len(), parse_progress))?;
        self.emit_progress(&item);

        let mut uploader =
            BatchUploader::new(self.api.as_ref(), self.settings.batch_size, parse_progress);
        if let Some(token) = &self.cancel {
            uploader = uploader.with_cancellation(token.clone());
        }

        let stats = uploader
            .upload(rows, mailing_name, |chunk| {
                let item = queue.update(id, |item| {
                    item.record_chunk(chunk.processed_rows, chunk.stats, chunk.progress)
                })?;
                self.emit_progress(&item);
                Ok(())
            })
            .await
            .map_err(|e| match e {
                CallMetricsError::Cancelled => CallMetricsError::upload_error("上传已取消"),
                other => other,
            })?;

        let item = queue.update(id, QueueItem::complete)?;
        self.emit_progress(&item);

        #[cfg(feature = "logging")]
        tracing::info!(
            "文件 {} 上传完成 -> {}: 新增 {}, 重复 {}",
            file.name(),
            mailing_name,
            stats.novos,
            stats.duplicados
        );

        Ok(stats)
    }
}
