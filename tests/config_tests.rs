use std::io::Write;
use std::path::Path;
use std::time::Duration;

use resttree::cli::{run, Cli};
use resttree::config::AppConfig;
use resttree::logging::{LogConfig, LogFormat};
use clap::Parser;

#[test]
fn test_bundled_config_file_loads() {
    let config = AppConfig::load(Path::new("config/config.yaml")).unwrap();
    assert_eq!(config.http.addr, "0.0.0.0:8080");
    assert_eq!(config.dispatch.method_override_param, "_method");
    assert_eq!(
        config.dispatch.request_timeout(),
        Some(Duration::from_millis(5000))
    );
    assert_eq!(config.logging.format.as_deref(), Some("json"));
}

#[test]
fn test_load_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "http:\n  addr: \"127.0.0.1:9999\"\n  metrics_endpoint: false\ndispatch:\n  max_depth: 4"
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.http.addr, "127.0.0.1:9999");
    assert!(!config.http.metrics_endpoint);
    assert!(config.http.health_endpoint);
    assert_eq!(config.dispatch.max_depth, 4);
    assert_eq!(config.http.ready_timeout(), Duration::from_millis(1000));
}

#[test]
fn test_ready_timeout_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "http:\n  ready_timeout_ms: 250").unwrap();
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.http.ready_timeout(), Duration::from_millis(250));
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn test_invalid_file_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "dispatch:\n  max_depth: many").unwrap();
    assert!(AppConfig::load(file.path()).is_err());
}

#[test]
fn test_logging_section_overrides_env_defaults() {
    let config = AppConfig::from_yaml_str("logging:\n  level: debug\n  format: pretty\n").unwrap();
    let log = LogConfig::default_dev().merged_with(&config.logging);
    assert_eq!(log.log_level, "debug");
    assert_eq!(log.format, LogFormat::Pretty);

    let untouched = LogConfig::default_dev().merged_with(&AppConfig::default().logging);
    assert_eq!(untouched.format, LogFormat::Pretty);
}

#[test]
fn test_cli_uses_config_for_resolution() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "dispatch:\n  method_override_param: verb").unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let cli = Cli::try_parse_from([
        "resttree",
        "--config",
        path.as_str(),
        "resolve",
        "--method",
        "POST",
        "/records/0?verb=DELETE",
    ])
    .unwrap();
    run(cli).unwrap();

    let cli = Cli::try_parse_from(["resttree", "--config", "/nonexistent/config.yaml", "routes"])
        .unwrap();
    assert!(run(cli).is_err());
}
