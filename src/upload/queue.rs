//! 上传队列
//!
//! 每个被选择的文件对应一个 [`QueueItem`]，状态机如下：
//!
//! ```text
//! PENDING --(轮到该项)--> READING --(解析成功)--> UPLOADING --(全部批次成功)--> COMPLETED
//! PENDING/READING/UPLOADING --(任何失败)--> ERROR
//! ```
//!
//! COMPLETED 与 ERROR 是终态。整个队列同一时刻最多只有一项处于 READING/UPLOADING。

use super::source::SourceFile;
use crate::api::MailingBatchResponse;
use crate::error::{CallMetricsError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 队列项标识，进程内唯一
pub type ItemId = Uuid;

/// 队列项状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Reading,
    Uploading,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Reading => "READING",
            ItemStatus::Uploading => "UPLOADING",
            ItemStatus::Completed => "COMPLETED",
            ItemStatus::Error => "ERROR",
        }
    }

    /// 界面上显示的状态文字
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "Aguardando",
            ItemStatus::Reading => "Lendo arquivo",
            ItemStatus::Uploading => "Enviando",
            ItemStatus::Completed => "Concluído",
            ItemStatus::Error => "Erro",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }

    /// 是否正在处理
    pub fn is_active(&self) -> bool {
        matches!(self, ItemStatus::Reading | ItemStatus::Uploading)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 累计的上传统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemStats {
    /// 新增联系人
    pub novos: u64,
    /// 重复记录
    pub duplicados: u64,
}

impl ItemStats {
    /// 累加一个批次的响应
    pub fn absorb(&mut self, response: &MailingBatchResponse) {
        self.novos += response.total_novos_malling;
        self.duplicados += response.total_duplicados_logs;
    }
}

/// 一个文件的上传记录
#[derive(Debug, Clone)]
pub struct QueueItem {
    id: ItemId,
    file: SourceFile,
    mailing_name: String,
    status: ItemStatus,
    progress: u8,
    total_rows: Option<usize>,
    processed_rows: usize,
    stats: ItemStats,
    error_message: Option<String>,
}

impl QueueItem {
    /// 新建待处理项，名单名称默认取文件名（去掉扩展名）
    pub fn new(file: SourceFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            mailing_name: file.default_mailing_name(),
            file,
            status: ItemStatus::Pending,
            progress: 0,
            total_rows: None,
            processed_rows: 0,
            stats: ItemStats::default(),
            error_message: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn mailing_name(&self) -> &str {
        &self.mailing_name
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn total_rows(&self) -> Option<usize> {
        self.total_rows
    }

    pub fn processed_rows(&self) -> usize {
        self.processed_rows
    }

    pub fn stats(&self) -> ItemStats {
        self.stats
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// 修改名单名称，仅 PENDING 状态有效；返回值表示名称是否被修改
    pub fn rename<S: Into<String>>(&mut self, name: S) -> bool {
        if self.status != ItemStatus::Pending {
            return false;
        }
        let name = name.into();
        if name == self.mailing_name {
            return false;
        }
        self.mailing_name = name;
        true
    }

    fn raise_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    fn transition_error(&self, to: ItemStatus) -> CallMetricsError {
        CallMetricsError::invalid_state(format!(
            "队列项 {} 不能从 {} 进入 {}",
            self.id, self.status, to
        ))
    }

    /// PENDING → READING
    pub fn begin_reading(&mut self, progress: u8) -> Result<()> {
        if self.status != ItemStatus::Pending {
            return Err(self.transition_error(ItemStatus::Reading));
        }
        self.status = ItemStatus::Reading;
        self.raise_progress(progress);
        Ok(())
    }

    /// READING → UPLOADING，记录总行数（只设置一次）
    pub fn begin_uploading(&mut self, total_rows: usize, progress: u8) -> Result<()> {
        if self.status != ItemStatus::Reading {
            return Err(self.transition_error(ItemStatus::Uploading));
        }
        self.status = ItemStatus::Uploading;
        self.total_rows = Some(total_rows);
        self.raise_progress(progress);
        Ok(())
    }

    /// 记录一个批次完成后的累计进度
    pub fn record_chunk(
        &mut self,
        processed_rows: usize,
        stats: ItemStats,
        progress: u8,
    ) -> Result<()> {
        if self.status != ItemStatus::Uploading {
            return Err(self.transition_error(ItemStatus::Uploading));
        }
        let total = self.total_rows.unwrap_or(0);
        if processed_rows > total || processed_rows < self.processed_rows {
            return Err(CallMetricsError::invalid_state(format!(
                "队列项 {} 的已处理行数 {} 无效 (当前 {}, 总计 {})",
                self.id, processed_rows, self.processed_rows, total
            )));
        }
        self.processed_rows = processed_rows;
        self.stats = stats;
        self.raise_progress(progress);
        Ok(())
    }

    /// UPLOADING → COMPLETED
    pub fn complete(&mut self) -> Result<()> {
        if self.status != ItemStatus::Uploading {
            return Err(self.transition_error(ItemStatus::Completed));
        }
        self.status = ItemStatus::Completed;
        self.raise_progress(100);
        Ok(())
    }

    /// 任意非终态 → ERROR
    pub fn fail<S: Into<String>>(&mut self, message: S) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.transition_error(ItemStatus::Error));
        }
        self.status = ItemStatus::Error;
        self.error_message = Some(message.into());
        Ok(())
    }
}

/// 队列概况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<QueueItem>,
    processing: bool,
}

/// 上传队列的共享句柄
///
/// 克隆得到的句柄指向同一个队列，观察者可以在处理过程中读取快照。
/// 处理进行时禁止删除、清理与重复启动。
#[derive(Debug, Clone, Default)]
pub struct UploadQueue {
    state: Arc<Mutex<QueueState>>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 追加一个文件
    pub fn add_file(&self, file: SourceFile) -> ItemId {
        let item = QueueItem::new(file);
        let id = item.id();
        #[cfg(feature = "logging")]
        tracing::debug!("加入队列: {} -> {}", item.file().name(), item.mailing_name());
        self.lock().items.push(item);
        id
    }

    /// 按顺序追加多个文件
    pub fn add_files<I: IntoIterator<Item = SourceFile>>(&self, files: I) -> Vec<ItemId> {
        files.into_iter().map(|file| self.add_file(file)).collect()
    }

    /// 删除一项，仅在没有处理进行且该项为 PENDING 时允许
    pub fn remove(&self, id: ItemId) -> Result<()> {
        let mut state = self.lock();
        if state.processing {
            return Err(CallMetricsError::invalid_state("队列处理中，不能删除"));
        }
        let Some(pos) = state.items.iter().position(|i| i.id == id) else {
            return Err(CallMetricsError::invalid_state(format!("队列项 {id} 不存在")));
        };
        if state.items[pos].status != ItemStatus::Pending {
            return Err(CallMetricsError::invalid_state(format!(
                "队列项 {id} 不是 PENDING 状态，不能删除"
            )));
        }
        state.items.remove(pos);
        Ok(())
    }

    /// 修改名单名称；处理进行中或非 PENDING 项保持不变并返回 false
    pub fn rename<S: Into<String>>(&self, id: ItemId, name: S) -> bool {
        let mut state = self.lock();
        if state.processing {
            return false;
        }
        state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .is_some_and(|item| item.rename(name))
    }

    /// 清除已完成和失败的项，返回清除的数量
    pub fn clear_finished(&self) -> Result<usize> {
        let mut state = self.lock();
        if state.processing {
            return Err(CallMetricsError::invalid_state("队列处理中，不能清理"));
        }
        let before = state.items.len();
        state.items.retain(|i| !i.status.is_terminal());
        Ok(before - state.items.len())
    }

    /// 所有项的快照，按加入顺序
    pub fn items(&self) -> Vec<QueueItem> {
        self.lock().items.clone()
    }

    pub fn get(&self, id: ItemId) -> Option<QueueItem> {
        self.lock().items.iter().find(|i| i.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    pub fn summary(&self) -> QueueSummary {
        let state = self.lock();
        let mut summary = QueueSummary { total: state.items.len(), ..Default::default() };
        for item in &state.items {
            match item.status {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Reading | ItemStatus::Uploading => summary.active += 1,
                ItemStatus::Completed => summary.completed += 1,
                ItemStatus::Error => summary.failed += 1,
            }
        }
        summary
    }

    /// 开始一轮处理：设置处理标志并返回此刻所有 PENDING 项的快照
    pub(crate) fn begin_run(&self) -> Result<(RunGuard, Vec<ItemId>)> {
        let mut state = self.lock();
        if state.processing {
            return Err(CallMetricsError::invalid_state("队列已经在处理中"));
        }
        state.processing = true;
        let pending = state
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .map(|i| i.id)
            .collect();
        Ok((RunGuard { queue: self.clone() }, pending))
    }

    /// 让一项进入 READING，返回此刻的文件与名单名称
    pub(crate) fn start_item(&self, id: ItemId, progress: u8) -> Result<(SourceFile, String)> {
        let mut state = self.lock();
        if let Some(other) = state.items.iter().find(|i| i.id != id && i.status.is_active()) {
            return Err(CallMetricsError::invalid_state(format!("队列项 {} 仍在处理中", other.id)));
        }
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CallMetricsError::invalid_state(format!("队列项 {id} 不存在")))?;
        item.begin_reading(progress)?;
        Ok((item.file.clone(), item.mailing_name.clone()))
    }

    /// 对某一项执行修改，返回修改后的快照
    pub(crate) fn update<F>(&self, id: ItemId, f: F) -> Result<QueueItem>
    where
        F: FnOnce(&mut QueueItem) -> Result<()>,
    {
        let mut state = self.lock();
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CallMetricsError::invalid_state(format!("队列项 {id} 不存在")))?;
        f(item)?;
        Ok(item.clone())
    }
}

/// 一轮处理的标志守卫，离开作用域时清除处理标志
pub(crate) struct RunGuard {
    queue: UploadQueue,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.queue.lock().processing = false;
    }
}
