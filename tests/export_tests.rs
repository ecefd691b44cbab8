//! 兼容数据分页导出的集成测试

mod common;

use callmetrics::api::{MailingApi, MailingListFilter, MailingListResponse};
use callmetrics::compare::{ExportEvent, MailingSelection, PaginatedExporter, load_mailings};
use callmetrics::config::{ArtifactFormat, ExportSettings};
use chrono::NaiveDate;
use common::{FakeApi, PageScript};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn settings(dir: &TempDir, format: ArtifactFormat) -> ExportSettings {
    ExportSettings {
        page_size: 5000,
        page_delay_ms: 0,
        out_dir: dir.path().to_string_lossy().into_owned(),
        file_prefix: "Relatorio_Compativel_CEPs".to_string(),
        format,
        sheet_name: "Compatíveis".to_string(),
    }
}

fn exporter_for(api: &Arc<FakeApi>, settings: ExportSettings) -> PaginatedExporter {
    PaginatedExporter::new(api.clone() as Arc<dyn MailingApi>, settings)
}

fn selection(names: &[&str]) -> MailingSelection {
    names.iter().copied().collect()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[tokio::test]
async fn test_collect_stops_at_reported_total_pages() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 5000, total_pages: 3 },
        PageScript::Page { rows: 5000, total_pages: 3 },
        PageScript::Page { rows: 1200, total_pages: 3 },
        PageScript::Page { rows: 10, total_pages: 3 },
    ]));
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv));

    let accumulator = exporter.collect(&selection(&["B", "A"])).await.unwrap();

    assert_eq!(accumulator.len(), 11200);
    assert_eq!(api.page_request_count(), 3);
    let requests = api.page_requests.lock().unwrap();
    let pages: Vec<u32> = requests.iter().map(|(_, page, _)| *page).collect();
    assert_eq!(pages, [1, 2, 3]);
    assert!(requests.iter().all(|(names, _, limit)| names == &["A", "B"] && *limit == 5000));
}

#[tokio::test(start_paused = true)]
async fn test_pages_are_throttled_between_requests() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 1, total_pages: 3 },
        PageScript::Page { rows: 1, total_pages: 3 },
        PageScript::Page { rows: 1, total_pages: 3 },
    ]));
    let mut export = settings(&dir, ArtifactFormat::Csv);
    export.page_delay_ms = 100;
    let exporter = exporter_for(&api, export);

    let start = Instant::now();
    let accumulator = exporter.collect(&selection(&["A"])).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(accumulator.len(), 3);
    assert_eq!(api.page_request_count(), 3);
    // 三页之间停顿两次，最后一页之后不再停顿
    assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_single_page_is_not_delayed() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 4, total_pages: 1 },
    ]));
    let mut export = settings(&dir, ArtifactFormat::Csv);
    export.page_delay_ms = 100;
    let exporter = exporter_for(&api, export);

    let start = Instant::now();
    exporter.collect(&selection(&["A"])).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_collect_stops_at_empty_page() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 3, total_pages: 10 },
        PageScript::Page { rows: 0, total_pages: 10 },
    ]));
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv));

    let accumulator = exporter.collect(&selection(&["A"])).await.unwrap();
    assert_eq!(accumulator.len(), 3);
    assert_eq!(api.page_request_count(), 2);
}

#[tokio::test]
async fn test_empty_first_page_is_no_data() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 0, total_pages: 0 },
    ]));
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv));

    let err = exporter.export(&selection(&["A", "B"]), date()).await.unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(api.page_request_count(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_selection_issues_no_request() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new());
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv));

    let err = exporter.export(&MailingSelection::new(), date()).await.unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(api.page_request_count(), 0);
}

#[tokio::test]
async fn test_page_failure_discards_partial_data() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 5000, total_pages: 3 },
        PageScript::Fail { status: 500, message: "timeout no banco".to_string() },
    ]));
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv));

    let err = exporter.export(&selection(&["A"]), date()).await.unwrap_err();
    assert!(err.is_export_error());
    assert!(err.user_message().contains("timeout no banco"));
    assert_eq!(api.page_request_count(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_export_writes_csv_with_dated_name() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 2, total_pages: 2 },
        PageScript::Page { rows: 1, total_pages: 2 },
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv)).with_observer(tx);

    let outcome = exporter.export(&selection(&["A", "B"]), date()).await.unwrap();
    drop(exporter);

    assert_eq!(outcome.rows, 3);
    assert_eq!(
        outcome.path.file_name().unwrap().to_str().unwrap(),
        "Relatorio_Compativel_CEPs_2024-06-01.csv"
    );
    let content = std::fs::read_to_string(&outcome.path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "id,telefone1,cep,nome_malling,data_insercao");
    assert!(lines[1].starts_with("100000,11900000000,01001-000,Base_SP,"));

    let mut fetched = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ExportEvent::PageFetched { page, accumulated, .. } = event {
            fetched.push((page, accumulated));
        }
    }
    assert_eq!(fetched, [(1, 2), (2, 3)]);
}

#[tokio::test]
async fn test_export_is_idempotent_for_same_selection() {
    let dir = TempDir::new().unwrap();
    let pages = || {
        vec![
            PageScript::Page { rows: 4, total_pages: 2 },
            PageScript::Page { rows: 2, total_pages: 2 },
        ]
    };
    let first = PaginatedExporter::new(
        Arc::new(FakeApi::new().with_pages(pages())) as Arc<dyn MailingApi>,
        settings(&dir, ArtifactFormat::Csv),
    )
    .export(&selection(&["A", "B"]), date())
    .await
    .unwrap();
    let first_content = std::fs::read(&first.path).unwrap();

    let second = PaginatedExporter::new(
        Arc::new(FakeApi::new().with_pages(pages())) as Arc<dyn MailingApi>,
        settings(&dir, ArtifactFormat::Csv),
    )
    .export(&selection(&["B", "A"]), date())
    .await
    .unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(first_content, std::fs::read(&second.path).unwrap());
}

#[tokio::test]
async fn test_export_cancelled_between_pages() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 5, total_pages: 3 },
        PageScript::Page { rows: 5, total_pages: 3 },
        PageScript::Page { rows: 5, total_pages: 3 },
    ]));
    let token = CancellationToken::new();
    token.cancel();
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Csv)).with_cancellation(token);

    let err = exporter.export(&selection(&["A"]), date()).await.unwrap_err();
    assert!(err.is_export_error());
    assert_eq!(api.page_request_count(), 0);
}

#[cfg(feature = "exporter-excel")]
#[tokio::test]
async fn test_export_writes_xlsx_readable_by_calamine() {
    use calamine::{Data, Reader, open_workbook_auto};

    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::new().with_pages(vec![
        PageScript::Page { rows: 2, total_pages: 1 },
    ]));
    let exporter = exporter_for(&api, settings(&dir, ArtifactFormat::Xlsx));

    let outcome = exporter.export(&selection(&["A"]), date()).await.unwrap();
    assert_eq!(
        outcome.path.file_name().unwrap().to_str().unwrap(),
        "Relatorio_Compativel_CEPs_2024-06-01.xlsx"
    );

    let mut workbook = open_workbook_auto(&outcome.path).unwrap();
    let range = workbook.worksheet_range("Compatíveis").unwrap();
    let rows: Vec<_> = range.rows().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Data::String("id".to_string()));
    assert_eq!(rows[1][0], Data::Float(100000.0));
    assert_eq!(rows[1][1], Data::String("11900000000".to_string()));
}

#[tokio::test]
async fn test_load_mailings_returns_empty_on_failure() {
    let api = FakeApi::new();
    assert!(load_mailings(&api, &MailingListFilter::default()).await.is_empty());

    *api.mailings.lock().unwrap() = Some(MailingListResponse {
        success: false,
        mailings: vec!["X".to_string()],
        total: 1,
        error: Some("falha".to_string()),
    });
    assert!(load_mailings(&api, &MailingListFilter::default()).await.is_empty());

    *api.mailings.lock().unwrap() = Some(MailingListResponse {
        success: true,
        mailings: vec!["Base_SP".to_string(), "Base_RJ".to_string()],
        total: 2,
        error: None,
    });
    assert_eq!(
        load_mailings(&api, &MailingListFilter::default()).await,
        ["Base_SP", "Base_RJ"]
    );
}
