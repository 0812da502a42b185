//! PostgreSQL Test Harness
//!
//! Runs SQL queries from YAML test documents and compares the returned rows
//! with the expected ones:
//! - Multi-document YAML discovery from files, directories or stdin
//! - Per-group connection retries
//! - Literal, regex and auto match modes for expected values
//! - Reverse tests that must fail
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Test Harness Flow                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Load test groups (loader)                                   │
//! │  2. For each group:                                             │
//! │     a. Switch log verbosity                                     │
//! │     b. Connect with retries (pg::connection)                    │
//! │     c. For each test: validate, query, compare (assertions)     │
//! │     d. Score outcome (report)                                   │
//! │  3. Log summary, exit with folded error count                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! pgtester tests/
//! pgtester -d tests/basic.yml tests/extra.yml
//! cat tests/basic.yml | pgtester --output json
//! ```

pub mod assertions;
pub mod cli;
pub mod error;
pub mod executor;
#[cfg(feature = "test-support")]
pub mod infra;
pub mod loader;
pub mod logging;
pub mod report;
pub mod spec;

// Re-export main types for convenience
pub use assertions::{compare_row, compare_row_set, ComparisonOutcome};
pub use error::{TestHarnessError, TestHarnessResult};
pub use executor::TestOrchestrator;
pub use logging::LogHandle;
pub use report::{exit_code, OutcomeAggregator, OutputFormat, RunSummary};
pub use spec::{ExpectedRow, ExpectedRowSet, ExpectedValue, MatchMode, TestDefinition, TestGroup};
