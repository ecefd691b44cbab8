//! 通话面板查询
//!
//! 通话录音、名单导入统计和拨号列表的加载。所有远程失败都转换为空结果并记录日志。

use crate::api::{
    Disposition, MailingApi, MailingStatsFilter, MailingStatsResponse, PaginationMeta,
    Recording, RecordingFilter,
};
use serde::Serialize;
use serde_json::Value;

/// 当前页的通话汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordingStats {
    /// 服务端报告的总记录数
    pub total: u64,
    /// 当前页接通率 (%)
    pub success_rate: u32,
    /// 当前页平均通话时长（秒）
    pub average_duration: u64,
}

impl RecordingStats {
    /// 基于当前页的数据计算，页为空时比率和时长为 0
    pub fn from_page(total: u64, rows: &[Recording]) -> Self {
        if rows.is_empty() {
            return Self { total, ..Default::default() };
        }
        let answered = rows
            .iter()
            .filter(|r| r.disposition == Disposition::Answered.as_str())
            .count() as u64;
        let durations: u64 = rows.iter().map(|r| duration_secs(&r.duration)).sum();
        let count = rows.len() as u64;
        Self {
            total,
            success_rate: (answered * 100 / count) as u32,
            average_duration: durations / count,
        }
    }
}

/// 一页通话录音及其分页、汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordingsView {
    pub rows: Vec<Recording>,
    pub pagination: PaginationMeta,
    pub stats: RecordingStats,
}

/// 时长转换为秒，接受 "HH:MM:SS"、"MM:SS" 或数字
pub fn duration_secs(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            if s.contains(':') {
                s.split(':')
                    .map(|part| part.trim().parse::<u64>().unwrap_or(0))
                    .fold(0, |acc, part| acc * 60 + part)
            } else {
                s.parse::<u64>().unwrap_or(0)
            }
        }
        _ => 0,
    }
}

/// 格式化为 `分:秒`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// 各通话结果的数量，按首次出现顺序
pub fn disposition_breakdown(rows: &[Recording]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in rows {
        match counts.iter_mut().find(|(name, _)| *name == row.disposition) {
            Some((_, count)) => *count += 1,
            None => counts.push((row.disposition.clone(), 1)),
        }
    }
    counts
}

/// 每日通话量，按首次出现顺序取前 `limit` 天
pub fn calls_per_day(rows: &[Recording], limit: usize) -> Vec<(String, usize)> {
    let mut days: Vec<(String, usize)> = Vec::new();
    for row in rows {
        let day: String = row.calldate.chars().take(10).collect();
        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, count)) => *count += 1,
            None => days.push((day, 1)),
        }
    }
    days.truncate(limit);
    days
}

/// 加载一页通话录音
pub async fn load_recordings(api: &dyn MailingApi, filter: &RecordingFilter) -> RecordingsView {
    match api.fetch_recordings(filter).await {
        Ok(response) => {
            let stats = RecordingStats::from_page(response.total_registros, &response.dados);
            let pagination = response.paginacao.unwrap_or_else(|| PaginationMeta {
                pagina_atual: filter.page,
                por_pagina: filter.limit,
                total_pages: 1,
                ..Default::default()
            });
            #[cfg(feature = "logging")]
            tracing::debug!(
                "加载通话录音: 第 {} 页, {} 条, 共 {} 条",
                pagination.pagina_atual,
                response.dados.len(),
                response.total_registros
            );
            RecordingsView { rows: response.dados, pagination, stats }
        }
        Err(_e) => {
            #[cfg(feature = "logging")]
            tracing::error!("加载通话录音失败: {}", _e);
            RecordingsView::default()
        }
    }
}

/// 加载名单导入统计
pub async fn load_mailing_stats(
    api: &dyn MailingApi,
    filter: &MailingStatsFilter,
) -> MailingStatsResponse {
    api.fetch_mailing_stats(filter).await.unwrap_or_else(|_e| {
        #[cfg(feature = "logging")]
        tracing::error!("加载名单统计失败: {}", _e);
        MailingStatsResponse::default()
    })
}

/// 加载拨号列表名称
pub async fn load_lists(api: &dyn MailingApi) -> Vec<String> {
    match api.fetch_lists().await {
        Ok(response) if response.success => response.listas,
        Ok(_) => Vec::new(),
        Err(_e) => {
            #[cfg(feature = "logging")]
            tracing::error!("加载拨号列表失败: {}", _e);
            Vec::new()
        }
    }
}
