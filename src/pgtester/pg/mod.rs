//! PostgreSQL access: connection strings, retrying connections, query
//! execution and canonical result values.

pub mod client;
pub mod connection;
pub mod dsn;
pub mod error;
pub mod result;
pub mod value;

pub use client::{decode_unrepresentable, Connector, PgSession, PostgresConnector, QueryOutput};
pub use connection::{ConnectionManager, RetryPolicy};
pub use dsn::{connect_string_value, ConnectionParameters};
pub use error::{PgError, PgResult};
pub use result::{Row, RowSet};
pub use value::{CellValue, PgInterval, PgNumeric, Temporal, NULL_LITERAL};
