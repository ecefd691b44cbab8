//! 表格文件读取
//!
//! 把用户选择的表格文件转换为按文件顺序排列的行记录。第一行是表头，
//! 之后每一行映射为 列名 → 单元格值；空单元格不写入记录，整行为空的行被跳过。
//! CSV 使用 `csv` 读取，xlsx/xls/ods 读取第一个工作表。

use crate::api::RowRecord;
use crate::error::{CallMetricsError, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Number, Value};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// 用户选择的文件：名称、大小和完整内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    size: u64,
    bytes: Arc<Vec<u8>>,
}

impl SourceFile {
    /// 从内存内容创建
    pub fn from_bytes<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), size: bytes.len() as u64, bytes: Arc::new(bytes) }
    }

    /// 读取磁盘上的文件
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("mailing")
            .to_string();
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 默认的名单名称：去掉最后一个扩展名的文件名
    pub fn default_mailing_name(&self) -> String {
        match self.name.rfind('.') {
            Some(pos)
                if pos + 1 < self.name.len() && !self.name[pos..].contains('/') =>
            {
                self.name[..pos].to_string()
            }
            _ => self.name.clone(),
        }
    }

    fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

/// 异步解析文件，保持文件中的行顺序
pub async fn read_rows(file: &SourceFile) -> Result<Vec<RowRecord>> {
    let file = file.clone();
    let name = file.name.clone();

    #[cfg(feature = "logging")]
    tracing::debug!("开始解析文件: {} ({} 字节)", file.name, file.size);

    let rows = tokio::task::spawn_blocking(move || parse_rows(&file))
        .await
        .map_err(|e| CallMetricsError::parse_error(&name, e.to_string()))??;

    #[cfg(feature = "logging")]
    tracing::debug!("文件 {} 解析完成: {} 行", name, rows.len());

    Ok(rows)
}

/// 同步解析，按扩展名选择读取方式
pub fn parse_rows(file: &SourceFile) -> Result<Vec<RowRecord>> {
    match file.extension().as_str() {
        "csv" => parse_csv(file),
        "xlsx" | "xlsm" | "xls" | "ods" => parse_workbook(file),
        other => Err(CallMetricsError::parse_error(
            file.name(),
            format!("不支持的文件类型: .{other}"),
        )),
    }
}

fn parse_csv(file: &SourceFile) -> Result<Vec<RowRecord>> {
    let bytes = file.bytes();
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| {
        CallMetricsError::parse_error(file.name(), format!("编码不是 UTF-8: {e}"))
    })?;

    let header_line = text.lines().next().unwrap_or("");
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count()
    {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| CallMetricsError::parse_error(file.name(), e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if raw_headers.iter().all(String::is_empty) {
        return Err(CallMetricsError::parse_error(file.name(), "文件没有表头"));
    }
    let mut headers = unique_headers(raw_headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| CallMetricsError::parse_error(file.name(), e.to_string()))?;
        // 超出表头的字段与无表头的列同样命名
        extend_headers(&mut headers, record.len());
        let mut row = RowRecord::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if !cell.is_empty() {
                row.insert(header.clone(), Value::String(cell.to_string()));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn parse_workbook(file: &SourceFile) -> Result<Vec<RowRecord>> {
    let cursor = Cursor::new(file.bytes().to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| CallMetricsError::parse_error(file.name(), e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CallMetricsError::parse_error(file.name(), "工作簿中没有工作表"))?
        .map_err(|e| CallMetricsError::parse_error(file.name(), e.to_string()))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Err(CallMetricsError::parse_error(file.name(), "文件没有表头"));
    };
    let headers = unique_headers(header_row.iter().map(header_text).collect());

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let mut row = RowRecord::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if let Some(value) = cell_value(cell) {
                row.insert(header.clone(), value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => match cell_value(other) {
            Some(Value::String(s)) => s,
            Some(value) => value.to_string(),
            None => String::new(),
        },
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => Some(float_value(*f)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        other => Some(Value::String(other.to_string())),
    }
}

/// 整数值的浮点数转换为整数，避免电话号码、CEP 出现 ".0"
fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

const EMPTY_HEADER: &str = "__EMPTY";

/// 空表头命名为 `__EMPTY`，重复的表头加上 `_1`、`_2` 后缀
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for header in raw {
        let base = if header.is_empty() { EMPTY_HEADER } else { header.as_str() };
        let name = unique_name(&seen, base);
        seen.push(name);
    }
    seen
}

/// 为宽于表头的行补足列名
fn extend_headers(headers: &mut Vec<String>, width: usize) {
    while headers.len() < width {
        let name = unique_name(headers, EMPTY_HEADER);
        headers.push(name);
    }
}

fn unique_name(seen: &[String], base: &str) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while seen.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    candidate
}
