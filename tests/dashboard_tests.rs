//! 面板查询的测试：成功路径使用模拟数据源，失败路径返回空结果

mod common;

use callmetrics::api::{
    Disposition, ListsResponse, MailingApi, MailingStatsFilter, MockMailingApi, RecordingFilter,
};
use callmetrics::dashboard::{
    RecordingStats, calls_per_day, disposition_breakdown, load_lists, load_mailing_stats,
    load_recordings,
};
use common::FakeApi;

#[tokio::test]
async fn test_load_recordings_from_mock() {
    let api = MockMailingApi::with_seed(7);
    let filter = RecordingFilter { limit: 15, ..Default::default() };

    let view = load_recordings(&api, &filter).await;
    assert_eq!(view.rows.len(), 15);
    assert_eq!(view.pagination.pagina_atual, 1);
    assert!(view.pagination.tem_proxima_pagina);
    assert_eq!(view.stats, RecordingStats::from_page(view.stats.total, &view.rows));
    assert!(view.stats.success_rate <= 100);

    let breakdown = disposition_breakdown(&view.rows);
    assert_eq!(breakdown.iter().map(|(_, n)| n).sum::<usize>(), 15);
    assert!(calls_per_day(&view.rows, 10).len() <= 10);
}

#[tokio::test]
async fn test_disposition_filter_on_mock() {
    let api = MockMailingApi::with_seed(7);
    let filter = RecordingFilter {
        disposition: Some(Disposition::Busy),
        limit: 50,
        ..Default::default()
    };
    let view = load_recordings(&api, &filter).await;
    assert!(view.rows.iter().all(|r| r.disposition == "BUSY"));
    assert_eq!(view.stats.success_rate, 0);
}

#[tokio::test]
async fn test_failures_become_empty_state() {
    let api = FakeApi::new();

    let view = load_recordings(&api, &RecordingFilter::default()).await;
    assert!(view.rows.is_empty());
    assert_eq!(view.stats, RecordingStats::default());

    let stats = load_mailing_stats(&api, &MailingStatsFilter::default()).await;
    assert!(stats.estatisticas.is_empty());
    assert_eq!(stats.total_mailings, 0);

    assert!(load_lists(&api).await.is_empty());
}

#[tokio::test]
async fn test_load_lists() {
    let api = FakeApi::new();
    *api.lists.lock().unwrap() = Some(ListsResponse {
        success: true,
        listas: vec!["Lista A".to_string()],
    });
    assert_eq!(load_lists(&api).await, ["Lista A"]);

    let mock = MockMailingApi::new();
    let lists = load_lists(&mock).await;
    let mut sorted = lists.clone();
    sorted.sort();
    assert_eq!(lists, sorted);
    assert_eq!(mock.name(), "Mock");
}
