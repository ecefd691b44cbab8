//! 名单批量上传
//!
//! - [`source`]：把表格文件解析为行记录
//! - [`queue`]：上传队列与队列项状态机
//! - [`batch`]：按固定批次大小顺序上传
//! - [`processor`]：逐项处理队列

pub mod batch;
pub mod processor;
pub mod queue;
pub mod source;

pub use batch::{BatchUploader, ChunkProgress, chunk_sizes, upload_progress};
pub use processor::{QueueEvent, QueueObserver, QueueProcessor, RunReport};
pub use queue::{ItemId, ItemStats, ItemStatus, QueueItem, QueueSummary, UploadQueue};
pub use source::{SourceFile, parse_rows, read_rows};
