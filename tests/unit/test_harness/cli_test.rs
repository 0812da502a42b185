//! Unit tests for the top-level run entry point

use crate::common::{catalog_handler, MockConnector};
use pgtester::pgtester::test_harness::cli::{run_with_connector, RunConfig};
use pgtester::pgtester::test_harness::{LogHandle, OutputFormat};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

async fn run(config: RunConfig, connector: &MockConnector) -> i32 {
    run_with_connector(&config, &LogHandle::detached(), Arc::new(connector.clone())).await
}

#[tokio::test]
async fn test_passing_suite_exits_zero() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "ok.yml",
        "tests:\n  - query: select count(*) total from pg_database\n    results:\n      - total: 3\n",
    );
    let connector = MockConnector::new(catalog_handler);
    assert_eq!(run(RunConfig::new(vec![path]), &connector).await, 0);
}

#[tokio::test]
async fn test_exit_code_counts_unexpected_results() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "bad.yml",
        "tests:\n  - query: select 5 as n\n    results:\n      - n: 4\n  - query: selec oops\n",
    );
    let connector = MockConnector::new(catalog_handler);
    let config = RunConfig::new(vec![path]).with_output_format(OutputFormat::Json);
    assert_eq!(run(config, &connector).await, 2);
}

#[tokio::test]
async fn test_malformed_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.yml", "tests:\n  - query: select 4 as n\n");
    let bad = write(&dir, "bad.yml", "tests: [unclosed\n");
    let connector = MockConnector::new(catalog_handler);

    assert_eq!(run(RunConfig::new(vec![good, bad]), &connector).await, 125);
    // nothing runs when any config fails to load
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_missing_path_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let connector = MockConnector::new(catalog_handler);
    let config = RunConfig::new(vec![dir.path().join("absent.yml")]).with_debug(true);
    assert_eq!(run(config, &connector).await, 125);
}

#[test]
fn test_output_format_parsing() {
    assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert!("xml".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
}
