//! 名单比较与兼容数据导出
//!
//! 用户选择若干名单后，按页拉取这些名单之间的兼容记录（CEP 重合），
//! 拼接后写出为表格文件。

pub mod artifact;
pub mod catalog;
pub mod paginator;
pub mod selection;

pub use artifact::{ArtifactWriter, CsvArtifactWriter, writer_for};
#[cfg(feature = "exporter-excel")]
pub use artifact::XlsxArtifactWriter;
pub use catalog::load_mailings;
pub use paginator::{
    ExportAccumulator, ExportEvent, ExportObserver, ExportOutcome, PaginatedExporter,
    artifact_file_name,
};
pub use selection::MailingSelection;
