//! 兼容数据分页导出
//!
//! 从第 1 页开始顺序请求，直到某一页没有记录，或者页码超过最近一次响应报告的
//! `totalPages`。两次请求之间停顿 `page_delay_ms`。任何一页失败都会放弃整个导出，
//! 已累积的数据被丢弃。

use super::artifact::{ArtifactWriter, writer_for};
use super::selection::MailingSelection;
use crate::api::{CompatibleRecord, MailingApi};
use crate::config::ExportSettings;
use crate::error::{CallMetricsError, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// 按页面获取顺序拼接的兼容记录
#[derive(Debug, Clone, Default)]
pub struct ExportAccumulator {
    records: Vec<CompatibleRecord>,
    pages: u32,
}

impl ExportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, rows: Vec<CompatibleRecord>) {
        self.records.extend(rows);
        self.pages += 1;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 已请求的页数
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn records(&self) -> &[CompatibleRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CompatibleRecord> {
        self.records
    }
}

/// 导出过程中的状态事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    PageFetched { page: u32, total_pages: u32, rows: usize, accumulated: usize },
    Writing { rows: usize },
    Finished { path: PathBuf, rows: usize },
}

pub type ExportObserver = UnboundedSender<ExportEvent>;

/// 导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows: usize,
}

/// 导出文件名：`<前缀>_<YYYY-MM-DD>.<扩展名>`
pub fn artifact_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}_{}.{}", prefix, date.format("%Y-%m-%d"), extension)
}

/// 分页导出器
pub struct PaginatedExporter {
    api: Arc<dyn MailingApi>,
    settings: ExportSettings,
    observer: Option<ExportObserver>,
    cancel: Option<CancellationToken>,
}

impl PaginatedExporter {
    pub fn new(api: Arc<dyn MailingApi>, settings: ExportSettings) -> Self {
        Self { api, settings, observer: None, cancel: None }
    }

    pub fn with_observer(mut self, observer: ExportObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(CallMetricsError::export_error("exportação cancelada"));
        }
        Ok(())
    }

    /// 顺序请求所有页面
    pub async fn collect(&self, selection: &MailingSelection) -> Result<ExportAccumulator> {
        if selection.is_empty() {
            return Err(CallMetricsError::invalid_state("没有选择任何名单"));
        }
        let mailings = selection.names();
        let limit = self.settings.page_size.max(1);
        let delay = Duration::from_millis(self.settings.page_delay_ms);

        #[cfg(feature = "logging")]
        tracing::info!("开始导出兼容数据: {} 个名单, 每页 {} 条", mailings.len(), limit);

        let mut accumulator = ExportAccumulator::new();
        let mut page: u32 = 1;
        let mut total_pages: u32 = 1;

        loop {
            self.check_cancelled()?;

            let response = self
                .api
                .fetch_compatible_page(&mailings, page, limit)
                .await
                .map_err(|e| {
                    CallMetricsError::export_error(format!(
                        "第 {page} 页请求失败: {}",
                        e.user_message()
                    ))
                })?;

            if response.dados.is_empty() {
                #[cfg(feature = "logging")]
                tracing::debug!("第 {} 页没有记录，结束分页", page);
                break;
            }

            let rows = response.dados.len();
            accumulator.push_page(response.dados);
            total_pages = response.total_pages;

            #[cfg(feature = "logging")]
            tracing::debug!(
                "第 {}/{} 页: {} 条, 累计 {} 条",
                page,
                total_pages,
                rows,
                accumulator.len()
            );
            self.emit(ExportEvent::PageFetched {
                page,
                total_pages,
                rows,
                accumulated: accumulator.len(),
            });

            page += 1;
            if page > total_pages {
                break;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        #[cfg(feature = "logging")]
        tracing::info!(
            "分页完成: {} 页, {} 条记录 (服务端报告 {} 页)",
            accumulator.pages(),
            accumulator.len(),
            total_pages
        );

        Ok(accumulator)
    }

    /// 请求所有页面并写出导出文件
    pub async fn export(
        &self,
        selection: &MailingSelection,
        today: NaiveDate,
    ) -> Result<ExportOutcome> {
        let accumulator = self.collect(selection).await?;
        if accumulator.is_empty() {
            return Err(CallMetricsError::no_data());
        }

        let writer = writer_for(&self.settings)?;
        let file_name =
            artifact_file_name(&self.settings.file_prefix, today, writer.extension());
        let path = Path::new(&self.settings.out_dir).join(file_name);
        let rows = accumulator.len();

        self.emit(ExportEvent::Writing { rows });
        write_artifact(writer, accumulator.into_records(), path.clone()).await?;

        #[cfg(feature = "logging")]
        tracing::info!("导出文件已生成: {} ({} 条记录)", path.display(), rows);

        self.emit(ExportEvent::Finished { path: path.clone(), rows });
        Ok(ExportOutcome { path, rows })
    }
}

async fn write_artifact(
    writer: Box<dyn ArtifactWriter>,
    records: Vec<CompatibleRecord>,
    path: PathBuf,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::task::spawn_blocking(move || writer.write(&records, &path))
        .await
        .map_err(|e| CallMetricsError::export_error(e.to_string()))?
}
