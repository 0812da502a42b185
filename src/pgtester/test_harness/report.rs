//! Outcome aggregation and run reporting
//!
//! Every test adds 0 or 1 to a running count of unexpected results, depending
//! on its outcome and its `reverse` flag. The final count folds into the
//! process exit code:
//! - `0`: no unexpected results
//! - `1..=124`: `((E - 1) % 124) + 1` for `E` unexpected results
//! - `125`: the test specification could not be loaded

use super::assertions::ComparisonOutcome;
use super::spec::TestDefinition;
use serde::Serialize;
use std::io::Write;

/// Exit code when no test could run because the configuration is unusable
pub const CONFIG_ERROR_EXIT_CODE: i32 = 125;

/// Highest exit code produced by unexpected results
pub const MAX_RESULT_EXIT_CODE: u64 = 124;

const RULE: char = '=';

/// Map the number of unexpected results to a process exit code
pub fn exit_code(unexpected: u64) -> i32 {
    if unexpected == 0 {
        return 0;
    }
    // Bounded by MAX_RESULT_EXIT_CODE, so the cast cannot truncate
    (((unexpected - 1) % MAX_RESULT_EXIT_CODE) + 1) as i32
}

/// Running count of unexpected results for one invocation
#[derive(Debug, Clone, Default)]
pub struct OutcomeAggregator {
    unexpected: u64,
}

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one outcome, returning what was added to the count
    pub fn record(&mut self, test: &TestDefinition, outcome: &ComparisonOutcome) -> u32 {
        let increase = if outcome.is_match() {
            test.increase_on_success()
        } else {
            test.increase_on_error()
        };
        self.unexpected += u64::from(increase);
        increase
    }

    pub fn unexpected(&self) -> u64 {
        self.unexpected
    }

    pub fn exit_code(&self) -> i32 {
        exit_code(self.unexpected)
    }
}

/// Result of one test within a group
#[derive(Debug, Clone, Serialize)]
pub struct TestRecord {
    pub index: usize,
    pub name: String,
    pub reverse: bool,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
    /// `success as expected`, `unexpected error`, ...
    pub message: String,
    pub unexpected: bool,
}

/// Results of one test group
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub tests: Vec<TestRecord>,
    /// Why the group stopped talking to the database, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned: Option<String>,
}

impl GroupSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            abandoned: None,
        }
    }

    pub fn unexpected(&self) -> usize {
        self.tests.iter().filter(|t| t.unexpected).count()
    }
}

/// Machine-readable summary of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub groups: Vec<GroupSummary>,
    pub tests: usize,
    pub passed: usize,
    pub unexpected: u64,
    pub exit_code: i32,
}

impl RunSummary {
    pub fn new(groups: Vec<GroupSummary>, aggregator: &OutcomeAggregator) -> Self {
        let tests = groups.iter().map(|g| g.tests.len()).sum();
        let failed: usize = groups.iter().map(GroupSummary::unexpected).sum();
        Self {
            groups,
            tests,
            passed: tests - failed,
            unexpected: aggregator.unexpected(),
            exit_code: aggregator.exit_code(),
        }
    }
}

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Log lines only
    #[default]
    Text,
    /// Log lines plus a JSON summary on stdout
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Horizontal rule as wide as `text`
pub fn rule_for(width: usize) -> String {
    std::iter::repeat(RULE).take(width).collect()
}

/// Log the `Running tests from ...` banner of a group
pub fn log_group_banner(group_name: &str) {
    let message = format!("Running tests from {}", group_name);
    let rule = rule_for(message.len());
    log::info!("{}", rule);
    log::info!("{}", message);
    log::info!("{}", rule);
}

/// Log the closing message of a run
pub fn log_final_summary(unexpected: u64) {
    if unexpected > 0 {
        let message = format!("unfortunately finished with {} unexpected results", unexpected);
        let rule = rule_for(message.len());
        log::error!("{}", rule);
        log::error!("{}", message);
        log::error!("{}", rule);
    } else {
        let message = "successfully finished without unexpected results";
        let rule = rule_for(message.len());
        log::info!("{}", rule);
        log::info!("{}", message);
        log::info!("{}", rule);
    }
}

/// Write the summary as pretty-printed JSON
pub fn write_json_summary(summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)
}
