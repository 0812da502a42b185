//! Error types for the database layer
//!
//! Connection failures are terminal for the caller (every retry has been spent),
//! while query failures carry enough context to be scored per test.

/// Errors produced while connecting to PostgreSQL or running a query
#[derive(Debug, Clone, thiserror::Error)]
pub enum PgError {
    /// Every connection attempt allowed by the retry policy failed
    #[error("connection retries exhausted after {attempts} attempt(s): {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    /// A single connection attempt failed
    #[error("could not connect: {message}")]
    Connect { message: String },

    /// The query could not be executed, or its result could not be read
    #[error("query failed: {cause}\n[SQL] {query}")]
    QueryFailed {
        query: String,
        cause: String,
        /// The link to the server is no longer usable
        link_closed: bool,
    },

    /// A result cell could not be decoded into a [`CellValue`](super::CellValue)
    #[error("could not read column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl PgError {
    /// Wrap a driver error raised while executing `query`
    pub fn query_failed(query: &str, err: &tokio_postgres::Error) -> Self {
        PgError::QueryFailed {
            query: query.to_string(),
            cause: err.to_string(),
            link_closed: err.is_closed(),
        }
    }

    /// Attach query context to a lower-level error
    pub fn in_query(self, query: &str) -> Self {
        match self {
            PgError::QueryFailed { .. } | PgError::ConnectionExhausted { .. } => self,
            PgError::Connect { message } => PgError::QueryFailed {
                query: query.to_string(),
                cause: message,
                link_closed: true,
            },
            other => PgError::QueryFailed {
                query: query.to_string(),
                cause: other.to_string(),
                link_closed: false,
            },
        }
    }

    /// Whether the cached connection handle must be dropped after this error
    pub fn is_link_fatal(&self) -> bool {
        match self {
            PgError::QueryFailed { link_closed, .. } => *link_closed,
            PgError::Connect { .. } | PgError::ConnectionExhausted { .. } => true,
            PgError::Decode { .. } => false,
        }
    }
}

/// Result type alias for database operations
pub type PgResult<T> = Result<T, PgError>;
