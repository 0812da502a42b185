//! CLI helpers for the pgtester binary
//!
//! [`run`] loads every test group, runs them against PostgreSQL and returns
//! the process exit code.

use super::executor::TestOrchestrator;
use super::loader;
use super::logging::LogHandle;
use super::report::{write_json_summary, OutputFormat, RunSummary, CONFIG_ERROR_EXIT_CODE};
use crate::pgtester::pg::{Connector, PostgresConnector};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a test run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Files or directories with test documents; stdin when empty
    pub paths: Vec<PathBuf>,

    /// Debug logging for every group
    pub debug: bool,

    /// Summary output format
    pub output_format: OutputFormat,
}

impl RunConfig {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Run all tests against PostgreSQL and return the exit code
pub async fn run(config: &RunConfig, log: &LogHandle) -> i32 {
    run_with_connector(config, log, Arc::new(PostgresConnector)).await
}

/// Same as [`run`] with a caller-supplied transport
pub async fn run_with_connector(
    config: &RunConfig,
    log: &LogHandle,
    connector: Arc<dyn Connector>,
) -> i32 {
    log.set_debug(config.debug);
    let groups = match loader::load_groups(&config.paths, config.debug) {
        Ok(groups) => groups,
        Err(e) => {
            log::error!("could not parse all configs: {}", e);
            return CONFIG_ERROR_EXIT_CODE;
        }
    };

    let orchestrator = TestOrchestrator::new(connector, log.clone());
    let summary = orchestrator.run_all(&groups).await;
    emit_summary(&summary, config.output_format);
    summary.exit_code
}

fn emit_summary(summary: &RunSummary, format: OutputFormat) {
    if format != OutputFormat::Json {
        return;
    }
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = write_json_summary(summary, &mut handle) {
        log::error!("could not write summary: {}", e);
    }
}
