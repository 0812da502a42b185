//! Database transport
//!
//! [`Connector`] opens sessions and [`PgSession`] runs queries. The
//! tokio-postgres implementation decodes every cell into a [`CellValue`] by
//! its server type; tests substitute scripted implementations.
//!
//! TLS follows libpq's `sslmode`: `disable` never negotiates it, `prefer`
//! (the default) falls back to plain TCP when the server declines, and
//! `require` insists on it. As with libpq, neither mode verifies the server
//! certificate.

use super::error::{PgError, PgResult};
use super::value::{CellValue, PgInterval, PgNumeric, Temporal};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres_rustls::MakeRustlsConnect;

/// Column names and decoded cells of one query execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// An open connection to the server
#[async_trait]
pub trait PgSession: Send {
    /// Whether the transport already knows the link is gone
    fn is_closed(&self) -> bool;

    /// Round-trip check that the server still answers
    async fn ping(&mut self) -> bool {
        !self.is_closed()
    }

    /// Run a parametrized query and decode its rows
    async fn query(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<QueryOutput>;

    /// Release the link
    async fn close(&mut self) {}
}

/// Opens sessions from a connection string
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, dsn: &str) -> PgResult<Box<dyn PgSession>>;
}

/// Connector backed by tokio-postgres, negotiating TLS through rustls
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    fn tls() -> PgResult<MakeRustlsConnect> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| PgError::Connect {
                message: format!("could not set up TLS: {}", e),
            })?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(UnverifiedServerCert { provider }))
            .with_no_client_auth();
        Ok(MakeRustlsConnect::new(config))
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, dsn: &str) -> PgResult<Box<dyn PgSession>> {
        let (client, connection) = tokio_postgres::connect(dsn, Self::tls()?)
            .await
            .map_err(|e| PgError::Connect {
                message: e.to_string(),
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::debug!("connection closed with error: {}", e);
            }
        });

        Ok(Box::new(PostgresSession { client, driver }))
    }
}

/// Accepts any server certificate but still checks handshake signatures,
/// which is what libpq does for `sslmode=require`
#[derive(Debug)]
struct UnverifiedServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for UnverifiedServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// A live tokio-postgres client plus the task driving its socket
pub struct PostgresSession {
    client: tokio_postgres::Client,
    driver: JoinHandle<()>,
}

#[async_trait]
impl PgSession for PostgresSession {
    fn is_closed(&self) -> bool {
        self.client.is_closed() || self.driver.is_finished()
    }

    async fn ping(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.client.simple_query("SELECT 1").await.is_ok()
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<QueryOutput> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| PgError::query_failed(sql, &e))?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = self
            .client
            .query(&statement, params)
            .await
            .map_err(|e| PgError::query_failed(sql, &e))?;

        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = (0..row.len())
                .map(|idx| decode_cell(row, idx))
                .collect::<PgResult<Vec<_>>>()
                .map_err(|e| e.in_query(sql))?;
            decoded.push(cells);
        }

        Ok(QueryOutput {
            columns,
            rows: decoded,
        })
    }

    async fn close(&mut self) {
        self.driver.abort();
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn read<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    idx: usize,
    wrap: impl FnOnce(T) -> CellValue,
) -> PgResult<CellValue> {
    row.try_get::<_, Option<T>>(idx)
        .map(|value| value.map_or(CellValue::Null, wrap))
        .map_err(|e| PgError::Decode {
            column: row.columns()[idx].name().to_string(),
            message: e.to_string(),
        })
}

fn floats<T: Into<f64>>(items: Vec<Option<T>>) -> CellValue {
    CellValue::NumericArray(items.into_iter().map(|i| i.map(Into::into)).collect())
}

/// Undecoded bytes of a cell
struct RawCell<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawCell<'a> {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawCell(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Retry a failed decode through [`decode_unrepresentable`]
fn or_unrepresentable(
    row: &tokio_postgres::Row,
    idx: usize,
    decoded: PgResult<CellValue>,
) -> PgResult<CellValue> {
    decoded.or_else(|err| {
        let ty = row.columns()[idx].type_();
        match row.try_get::<_, Option<RawCell>>(idx) {
            Ok(Some(RawCell(raw))) => decode_unrepresentable(ty, raw).ok_or(err),
            _ => Err(err),
        }
    })
}

/// Canonical form of server values the regular decoders cannot represent
///
/// `numeric` values outside the decimal range (and `NaN`, `Infinity`) keep
/// the text PostgreSQL prints for them; infinite dates and timestamps become
/// `infinity` / `-infinity`. Finite dates beyond chrono's range have no
/// canonical form. `None` means the bytes are malformed for the type.
pub fn decode_unrepresentable(ty: &Type, raw: &[u8]) -> Option<CellValue> {
    match ty.name() {
        "numeric" => PgNumeric::from_sql(ty, raw)
            .ok()
            .map(|n| CellValue::Text(n.0)),
        "date" => {
            let days = i32::from_be_bytes(raw.try_into().ok()?);
            Some(match days {
                i32::MAX => CellValue::Text("infinity".to_string()),
                i32::MIN => CellValue::Text("-infinity".to_string()),
                _ => CellValue::Unknown(ty.name().to_string()),
            })
        }
        "timestamp" | "timestamptz" => {
            let micros = i64::from_be_bytes(raw.try_into().ok()?);
            Some(match micros {
                i64::MAX => CellValue::Text("infinity".to_string()),
                i64::MIN => CellValue::Text("-infinity".to_string()),
                _ => CellValue::Unknown(ty.name().to_string()),
            })
        }
        _ => None,
    }
}

/// Decode one cell by the column's server type
pub fn decode_cell(row: &tokio_postgres::Row, idx: usize) -> PgResult<CellValue> {
    let ty = row.columns()[idx].type_();
    match ty.name() {
        "bool" => read(row, idx, CellValue::Bool),
        "char" => read(row, idx, |v: i8| CellValue::Integer(v.into())),
        "int2" => read(row, idx, |v: i16| CellValue::Integer(v.into())),
        "int4" => read(row, idx, |v: i32| CellValue::Integer(v.into())),
        "int8" => read(row, idx, CellValue::Integer),
        "oid" => read(row, idx, |v: u32| CellValue::Integer(v.into())),
        "float4" => read(row, idx, |v: f32| CellValue::Float(v.into())),
        "float8" => read(row, idx, CellValue::Float),
        "numeric" => or_unrepresentable(row, idx, read(row, idx, CellValue::Decimal)),
        "bytea" => read(row, idx, CellValue::Bytes),
        "date" => or_unrepresentable(
            row,
            idx,
            read(row, idx, |v: NaiveDate| CellValue::Timestamp(Temporal::Date(v))),
        ),
        "time" => read(row, idx, |v: NaiveTime| CellValue::Timestamp(Temporal::Time(v))),
        "timestamp" => or_unrepresentable(
            row,
            idx,
            read(row, idx, |v: NaiveDateTime| {
                CellValue::Timestamp(Temporal::Timestamp(v))
            }),
        ),
        "timestamptz" => or_unrepresentable(
            row,
            idx,
            read(row, idx, |v: DateTime<Utc>| {
                CellValue::Timestamp(Temporal::TimestampTz(v))
            }),
        ),
        "interval" => read(row, idx, PgInterval::to_cell),
        "_float4" => read(row, idx, floats::<f32>),
        "_float8" => read(row, idx, floats::<f64>),
        "_int2" => read(row, idx, floats::<i16>),
        "_int4" => read(row, idx, floats::<i32>),
        "_int8" => read(row, idx, |items: Vec<Option<i64>>| {
            CellValue::NumericArray(items.into_iter().map(|i| i.map(|v| v as f64)).collect())
        }),
        "_numeric" => read(row, idx, |items: Vec<Option<PgNumeric>>| {
            CellValue::NumericArray(items.into_iter().map(|i| i.and_then(|n| n.to_f64())).collect())
        }),
        _ if <String as FromSql>::accepts(ty) => read(row, idx, CellValue::Text),
        other => Ok(CellValue::Unknown(other.to_string())),
    }
}
