//! 配置文件加载、保存与环境变量覆盖的测试

use callmetrics::config::{ArtifactFormat, Config, DataSourceKind};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.log.enable_stdout);
    assert_eq!(config.log.log_dir, "logs");
    assert_eq!(config.log.level, "info");
    assert_eq!(config.api.source, DataSourceKind::Live);
    assert_eq!(config.api.timeout_secs, 60);
    assert_eq!(config.upload.batch_size, 500);
    assert_eq!(config.upload.parse_progress, 10);
    assert_eq!(config.export.page_size, 5000);
    assert_eq!(config.export.page_delay_ms, 100);
    assert_eq!(config.export.file_prefix, "Relatorio_Compativel_CEPs");
    #[cfg(feature = "exporter-excel")]
    assert_eq!(config.export.format, ArtifactFormat::Xlsx);
    #[cfg(not(feature = "exporter-excel"))]
    assert_eq!(config.export.format, ArtifactFormat::Csv);
    assert_eq!(config.dashboard.page_size, 15);
    assert!(config.validate().is_ok());
}

#[cfg(not(feature = "exporter-excel"))]
#[test]
fn test_xlsx_requires_excel_feature() {
    assert!(Config::from_str("[api]\nsource = \"mock\"\n").is_ok());

    let err = Config::from_str("[export]\nformat = \"xlsx\"\n").unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[log]
level = "debug"
enable_stdout = false

[api]
base_url = "http://localhost:3060"
source = "mock"

[upload]
batch_size = 250

[export]
format = "csv"
out_dir = "relatorios"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.log.level, "debug");
    assert!(!config.log.enable_stdout);
    assert_eq!(config.api.base_url, "http://localhost:3060");
    assert_eq!(config.api.source, DataSourceKind::Mock);
    assert_eq!(config.api.upload_endpoint, "/subir-malling");
    assert_eq!(config.upload.batch_size, 250);
    assert_eq!(config.upload.parse_progress, 10);
    assert_eq!(config.export.format, ArtifactFormat::Csv);
    assert_eq!(config.export.out_dir, "relatorios");
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = Config::default();
    config.export.page_delay_ms = 250;
    config.export.format = ArtifactFormat::Csv;
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.export.page_delay_ms, 250);
    assert_eq!(loaded.export.format, ArtifactFormat::Csv);
}

#[test]
fn test_invalid_values_are_config_errors() {
    let err = Config::from_str("[upload]\nbatch_size = 0\n").unwrap_err();
    assert!(err.is_config_error());

    let err = Config::from_str("[api]\nbase_url = \"\"\nsource = \"live\"\n").unwrap_err();
    assert!(err.is_config_error());

    // 模拟数据源不需要 base_url
    assert!(Config::from_str("[api]\nbase_url = \"\"\nsource = \"mock\"\n").is_ok());

    let err = Config::from_str("[export]\nformat = \"pdf\"\n").unwrap_err();
    assert!(err.is_config_error());

    let err = Config::from_str("not toml at all [").unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::from_file(dir.path().join("nope.toml")).unwrap_err();
    assert!(err.is_io_error());
}
