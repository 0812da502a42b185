//! Error types for the test harness
//!
//! Configuration problems are fatal for the whole run; validation, connection
//! and execution errors are scored per test.

use crate::pgtester::pg::PgError;
use std::fmt;
use std::io;

/// Main error type for test harness operations
#[derive(Debug, Clone)]
pub enum TestHarnessError {
    /// Test specification is unusable (bad values, invalid pattern, ...)
    ConfigError { message: String, source_name: String },

    /// Failed to parse test specification YAML
    SpecParseError { message: String, file: String },

    /// IO error (file discovery and reading)
    IoError { message: String, path: String },

    /// Test definition rejected before execution
    ValidationError { message: String },

    /// No connection could be obtained for a group
    ConnectionError { message: String, group: String },

    /// Infrastructure startup failure (testcontainers)
    InfraError {
        message: String,
        source: Option<String>,
    },

    /// Query execution failure
    ExecutionError {
        message: String,
        query_name: String,
        source: Option<String>,
    },
}

impl TestHarnessError {
    /// Configuration errors stop the run before any test executes
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TestHarnessError::ConfigError { .. }
                | TestHarnessError::SpecParseError { .. }
                | TestHarnessError::IoError { .. }
        )
    }

    /// Errors after which no further test of the group can run
    pub fn is_connection_error(&self) -> bool {
        matches!(self, TestHarnessError::ConnectionError { .. })
    }

    /// Name the group a connection error belongs to
    pub fn in_group(self, name: &str) -> Self {
        match self {
            TestHarnessError::ConnectionError { message, group } if group.is_empty() => {
                TestHarnessError::ConnectionError {
                    message,
                    group: name.to_string(),
                }
            }
            other => other,
        }
    }

    /// Attach the file or stream name to a load error that lacks one
    pub fn with_source(self, name: &str) -> Self {
        match self {
            TestHarnessError::SpecParseError { message, file } if file.is_empty() => {
                TestHarnessError::SpecParseError {
                    message,
                    file: name.to_string(),
                }
            }
            TestHarnessError::IoError { message, path } if path.is_empty() => {
                TestHarnessError::IoError {
                    message,
                    path: name.to_string(),
                }
            }
            TestHarnessError::ConfigError {
                message,
                source_name,
            } if source_name.is_empty() => TestHarnessError::ConfigError {
                message,
                source_name: name.to_string(),
            },
            other => other,
        }
    }
}

impl fmt::Display for TestHarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestHarnessError::ConfigError {
                message,
                source_name,
            } => {
                if source_name.is_empty() {
                    write!(f, "Configuration error: {}", message)
                } else {
                    write!(f, "Configuration error in {}: {}", source_name, message)
                }
            }
            TestHarnessError::SpecParseError { message, file } => {
                write!(f, "Test spec parse error in {}: {}", file, message)
            }
            TestHarnessError::IoError { message, path } => {
                write!(f, "IO error for '{}': {}", path, message)
            }
            TestHarnessError::ValidationError { message } => {
                write!(f, "Invalid test definition: {}", message)
            }
            TestHarnessError::ConnectionError { message, group } => {
                if group.is_empty() {
                    write!(f, "Connection error: {}", message)
                } else {
                    write!(f, "Connection error for {}: {}", group, message)
                }
            }
            TestHarnessError::InfraError { message, source } => {
                if let Some(s) = source {
                    write!(f, "Infrastructure error: {} ({})", message, s)
                } else {
                    write!(f, "Infrastructure error: {}", message)
                }
            }
            TestHarnessError::ExecutionError {
                message,
                query_name,
                source,
            } => {
                if let Some(s) = source {
                    write!(
                        f,
                        "Execution error in query '{}': {} ({})",
                        query_name, message, s
                    )
                } else {
                    write!(f, "Execution error in query '{}': {}", query_name, message)
                }
            }
        }
    }
}

impl std::error::Error for TestHarnessError {}

impl From<io::Error> for TestHarnessError {
    fn from(err: io::Error) -> Self {
        TestHarnessError::IoError {
            message: err.to_string(),
            path: String::new(),
        }
    }
}

impl From<serde_yaml::Error> for TestHarnessError {
    fn from(err: serde_yaml::Error) -> Self {
        TestHarnessError::SpecParseError {
            message: err.to_string(),
            file: String::new(),
        }
    }
}

impl From<PgError> for TestHarnessError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::ConnectionExhausted { .. } => TestHarnessError::ConnectionError {
                message: err.to_string(),
                group: String::new(),
            },
            PgError::QueryFailed { query, cause, .. } => TestHarnessError::ExecutionError {
                message: cause,
                query_name: query,
                source: None,
            },
            other => TestHarnessError::ExecutionError {
                message: other.to_string(),
                query_name: String::new(),
                source: None,
            },
        }
    }
}

/// Result type alias for test harness operations
pub type TestHarnessResult<T> = Result<T, TestHarnessError>;
