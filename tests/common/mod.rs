//! 集成测试公共模块

#![allow(dead_code)]

use async_trait::async_trait;
use callmetrics::api::{
    CompatiblePage, CompatibleRecord, ListsResponse, MAILING_NAME_FIELD, MailingApi,
    MailingBatchResponse, MailingListFilter, MailingListResponse, MailingStatsFilter,
    MailingStatsResponse, RecordingFilter, RecordingsResponse, RowRecord,
};
use callmetrics::error::{CallMetricsError, Result};
use callmetrics::upload::{SourceFile, UploadQueue};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// 兼容数据接口的脚本化响应
#[derive(Debug, Clone)]
pub enum PageScript {
    Page { rows: usize, total_pages: u32 },
    Fail { status: u16, message: String },
}

/// 记录所有调用的假数据源
#[derive(Default)]
pub struct FakeApi {
    /// 每次上传调用收到的批次
    pub chunks: Mutex<Vec<Vec<RowRecord>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// 第 N 次上传调用（从 1 开始）返回 HTTP 500
    fail_upload_calls: Mutex<Vec<usize>>,
    upload_calls: AtomicUsize,
    /// 上传时观察的队列，记录同时处于处理中的项数
    watched_queue: Mutex<Option<UploadQueue>>,
    max_active_items: AtomicUsize,
    /// 兼容数据分页脚本
    pages: Mutex<VecDeque<PageScript>>,
    /// 兼容数据请求 (名单, 页码, 每页条数)
    pub page_requests: Mutex<Vec<(Vec<String>, u32, u32)>>,
    pub mailings: Mutex<Option<MailingListResponse>>,
    pub recordings: Mutex<Option<RecordingsResponse>>,
    pub lists: Mutex<Option<ListsResponse>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload_call(self, call: usize) -> Self {
        self.fail_upload_calls.lock().unwrap().push(call);
        self
    }

    pub fn watch_queue(&self, queue: &UploadQueue) {
        *self.watched_queue.lock().unwrap() = Some(queue.clone());
    }

    pub fn with_pages(self, pages: Vec<PageScript>) -> Self {
        *self.pages.lock().unwrap() = pages.into();
        self
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_active_items(&self) -> usize {
        self.max_active_items.load(Ordering::SeqCst)
    }

    pub fn page_request_count(&self) -> usize {
        self.page_requests.lock().unwrap().len()
    }
}

fn remote_unavailable() -> CallMetricsError {
    CallMetricsError::Api { status: 503, message: "serviço indisponível".to_string() }
}

#[async_trait]
impl MailingApi for FakeApi {
    fn name(&self) -> &str {
        "fake"
    }

    async fn upload_batch(&self, rows: &[RowRecord]) -> Result<MailingBatchResponse> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(queue) = self.watched_queue.lock().unwrap().as_ref() {
            self.max_active_items.fetch_max(queue.summary().active, Ordering::SeqCst);
        }

        tokio::task::yield_now().await;
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_upload_calls.lock().unwrap().contains(&call) {
            return Err(CallMetricsError::Api {
                status: 500,
                message: "Erro ao inserir mailing".to_string(),
            });
        }

        self.chunks.lock().unwrap().push(rows.to_vec());
        let duplicados = rows
            .iter()
            .filter(|r| r.get("dup").and_then(Value::as_str) == Some("1"))
            .count() as u64;
        Ok(MailingBatchResponse {
            message: "ok".to_string(),
            total_itens: rows.len() as u64,
            total_telefones_processados: rows.len() as u64,
            total_novos_malling: rows.len() as u64 - duplicados,
            total_duplicados_logs: duplicados,
            error: None,
        })
    }

    async fn list_mailings(&self, _filter: &MailingListFilter) -> Result<MailingListResponse> {
        self.mailings.lock().unwrap().clone().ok_or_else(remote_unavailable)
    }

    async fn fetch_compatible_page(
        &self,
        mailings: &[String],
        page: u32,
        limit: u32,
    ) -> Result<CompatiblePage> {
        self.page_requests.lock().unwrap().push((mailings.to_vec(), page, limit));
        let script = self.pages.lock().unwrap().pop_front();
        match script {
            Some(PageScript::Page { rows, total_pages }) => Ok(CompatiblePage {
                total_registros: 0,
                pagina_atual: page,
                por_pagina: limit,
                total_pages,
                dados: (0..rows).map(|i| compatible_record(page, i)).collect(),
                error: None,
            }),
            Some(PageScript::Fail { status, message }) => {
                Err(CallMetricsError::Api { status, message })
            }
            None => Ok(CompatiblePage { pagina_atual: page, ..Default::default() }),
        }
    }

    async fn fetch_recordings(&self, _filter: &RecordingFilter) -> Result<RecordingsResponse> {
        self.recordings.lock().unwrap().clone().ok_or_else(remote_unavailable)
    }

    async fn fetch_mailing_stats(
        &self,
        _filter: &MailingStatsFilter,
    ) -> Result<MailingStatsResponse> {
        Err(remote_unavailable())
    }

    async fn fetch_lists(&self) -> Result<ListsResponse> {
        self.lists.lock().unwrap().clone().ok_or_else(remote_unavailable)
    }
}

/// 兼容记录：id、电话、地址、来源名单、插入时间
pub fn compatible_record(page: u32, index: usize) -> CompatibleRecord {
    let mut record = CompatibleRecord::new();
    record.insert("id".to_string(), Value::from(page as u64 * 100_000 + index as u64));
    record.insert("telefone1".to_string(), Value::from(format!("119{index:08}")));
    record.insert("cep".to_string(), Value::from("01001-000"));
    record.insert("nome_malling".to_string(), Value::from("Base_SP"));
    record.insert("data_insercao".to_string(), Value::from("2024-05-01T10:00:00Z"));
    record
}

/// 生成 `rows` 行的分号分隔 CSV
pub fn csv_content(rows: usize) -> String {
    let mut content = String::from("nome;telefone1;cep\n");
    for i in 0..rows {
        content.push_str(&format!("Cliente {i};119{i:08};01001-000\n"));
    }
    content
}

/// 内存中的 CSV 文件
pub fn csv_file(name: &str, rows: usize) -> SourceFile {
    SourceFile::from_bytes(name, csv_content(rows).into_bytes())
}

/// 损坏的 xlsx 文件
pub fn corrupt_file(name: &str) -> SourceFile {
    SourceFile::from_bytes(name, b"PK\x03\x04 not really a workbook".to_vec())
}

/// 在临时目录中写入文件
pub fn write_temp_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let path = dir.path().join(filename);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// 名单名称字段的值
pub fn mailing_name_of(row: &RowRecord) -> Option<&str> {
    row.get(MAILING_NAME_FIELD).and_then(Value::as_str)
}
