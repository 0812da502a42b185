//! # pgtester
//!
//! A declarative assertion runner for PostgreSQL. Test specifications are YAML
//! documents that name a connection, a retry policy and an ordered list of
//! queries with their expected rows; the runner executes every query, compares
//! what the server returned with what the document expects and folds the
//! outcomes into a bounded process exit code.

// Allow certain clippy warnings for development
#![allow(clippy::collapsible_if)]
#![allow(clippy::large_enum_variant)]
//!
//! ## Quick Start
//!
//! ```yaml
//! dsn:
//!   host: localhost
//!   user: postgres
//! retries: 10
//! delay: 1s
//! tests:
//!   - name: number of databases
//!     query: select count(*) total from pg_database
//!     results:
//!       - total: 3
//! ```
//!
//! ```bash
//! pgtester tests/            # every YAML file below tests/, sorted by name
//! cat tests.yml | pgtester   # read the documents from stdin
//! ```
//!
//! ## Library use
//!
//! ```rust,no_run
//! use pgtester::pgtester::test_harness::cli::{run, RunConfig};
//! use pgtester::pgtester::test_harness::logging::LogHandle;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = LogHandle::detached();
//!     let config = RunConfig::new(vec!["tests/".into()]);
//!     let code = run(&config, &log).await;
//!     std::process::exit(code);
//! }
//! ```

pub mod pgtester;

// Re-export the main API at crate root for easy access
pub use pgtester::pg::{
    CellValue, ConnectionManager, ConnectionParameters, PgError, RetryPolicy, Row, RowSet,
};
pub use pgtester::test_harness::{
    ComparisonOutcome, OutcomeAggregator, TestDefinition, TestGroup, TestHarnessError,
};
pub use pgtester::version::APP_VERSION;
