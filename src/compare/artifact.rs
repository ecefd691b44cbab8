//! 导出文件生成
//!
//! 列顺序取第一条记录的字段顺序，之后记录中新出现的字段按出现顺序追加到末尾；
//! 记录缺少的字段写为空单元格。

use crate::api::CompatibleRecord;
use crate::config::{ArtifactFormat, ExportSettings};
use crate::error::{CallMetricsError, Result};
use serde_json::Value;
use std::path::Path;

/// 导出文件写入器
pub trait ArtifactWriter: Send + Sync {
    /// 文件扩展名
    fn extension(&self) -> &'static str;

    /// 把所有记录写入 `path`
    fn write(&self, records: &[CompatibleRecord], path: &Path) -> Result<()>;
}

/// 计算列顺序
pub fn columns(records: &[CompatibleRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// 单元格文本：null 为空，字符串原样，其余使用 JSON 表示
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// CSV 导出
#[derive(Debug, Clone, Default)]
pub struct CsvArtifactWriter;

impl ArtifactWriter for CsvArtifactWriter {
    fn extension(&self) -> &'static str {
        ArtifactFormat::Csv.extension()
    }

    fn write(&self, records: &[CompatibleRecord], path: &Path) -> Result<()> {
        let columns = columns(records);
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|c| cell_text(record.get(c))))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Excel 导出，单个工作表：表头行之后是数据行
#[cfg(feature = "exporter-excel")]
#[derive(Debug, Clone)]
pub struct XlsxArtifactWriter {
    sheet_name: String,
}

#[cfg(feature = "exporter-excel")]
impl XlsxArtifactWriter {
    pub fn new<S: Into<String>>(sheet_name: S) -> Self {
        Self { sheet_name: sheet_name.into() }
    }
}

#[cfg(feature = "exporter-excel")]
fn xlsx_error(e: xlsxwriter::XlsxError) -> CallMetricsError {
    CallMetricsError::export_error(format!("Excel 写入失败: {e}"))
}

#[cfg(feature = "exporter-excel")]
impl ArtifactWriter for XlsxArtifactWriter {
    fn extension(&self) -> &'static str {
        ArtifactFormat::Xlsx.extension()
    }

    fn write(&self, records: &[CompatibleRecord], path: &Path) -> Result<()> {
        use xlsxwriter::Workbook;

        let path_str = path.to_str().ok_or_else(|| {
            CallMetricsError::export_error(format!("无效的导出路径: {}", path.display()))
        })?;
        let columns = columns(records);

        let workbook = Workbook::new(path_str).map_err(xlsx_error)?;
        {
            let mut sheet =
                workbook.add_worksheet(Some(self.sheet_name.as_str())).map_err(xlsx_error)?;

            for (col, name) in columns.iter().enumerate() {
                sheet.write_string(0, col as u16, name, None).map_err(xlsx_error)?;
            }

            for (index, record) in records.iter().enumerate() {
                let row = index as u32 + 1;
                for (col, name) in columns.iter().enumerate() {
                    let col = col as u16;
                    match record.get(name) {
                        None | Some(Value::Null) => {}
                        Some(Value::Number(n)) => {
                            let value = n.as_f64().unwrap_or_default();
                            sheet.write_number(row, col, value, None).map_err(xlsx_error)?;
                        }
                        Some(Value::Bool(b)) => {
                            sheet.write_boolean(row, col, *b, None).map_err(xlsx_error)?;
                        }
                        Some(other) => {
                            let text = cell_text(Some(other));
                            sheet.write_string(row, col, &text, None).map_err(xlsx_error)?;
                        }
                    }
                }
            }
        }
        workbook.close().map_err(xlsx_error)?;
        Ok(())
    }
}

/// 根据配置选择写入器
pub fn writer_for(settings: &ExportSettings) -> Result<Box<dyn ArtifactWriter>> {
    match settings.format {
        ArtifactFormat::Csv => Ok(Box::new(CsvArtifactWriter)),
        #[cfg(feature = "exporter-excel")]
        ArtifactFormat::Xlsx => {
            Ok(Box::new(XlsxArtifactWriter::new(settings.sheet_name.clone())))
        }
        #[cfg(not(feature = "exporter-excel"))]
        ArtifactFormat::Xlsx => Err(CallMetricsError::config_error(
            "xlsx 导出需要启用 exporter-excel 特性",
        )),
    }
}
