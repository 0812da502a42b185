//! Connection manager and query runner
//!
//! A [`ConnectionManager`] owns at most one live session per test group. It is
//! either disconnected or holds a cached session, which is checked before every
//! reuse and dropped as soon as a query reports that the link is gone.

use super::client::{Connector, PgSession};
use super::dsn::ConnectionParameters;
use super::error::{PgError, PgResult};
use super::result::{Row, RowSet};
use crate::pgtester::test_harness::logging::LogHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_postgres::types::ToSql;

/// Fixed-interval reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Constant wait between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// One attempt, no waiting
    pub fn single_attempt() -> Self {
        Self::new(0, Self::DEFAULT_DELAY)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Upper bound of time spent sleeping before giving up
    pub fn total_wait(&self) -> Duration {
        self.delay.saturating_mul(self.max_retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

/// Connection state machine plus query execution for one test group
pub struct ConnectionManager {
    params: ConnectionParameters,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    session: Option<Box<dyn PgSession>>,
    log: LogHandle,
}

impl ConnectionManager {
    pub fn new(
        params: ConnectionParameters,
        policy: RetryPolicy,
        connector: Arc<dyn Connector>,
        log: LogHandle,
    ) -> Self {
        Self {
            params,
            policy,
            connector,
            session: None,
            log,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Verbosity handle shared with the orchestrator
    pub fn log_handle(&self) -> &LogHandle {
        &self.log
    }

    /// Whether a session is cached (it may still turn out to be dead)
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Make sure a live session is cached, reconnecting with retries if needed
    pub async fn ensure_connected(&mut self) -> PgResult<()> {
        let alive = match self.session.as_mut() {
            Some(session) => Some(session.ping().await),
            None => None,
        };
        match alive {
            Some(true) => return Ok(()),
            Some(false) => {
                log::debug!("cached connection is no longer alive, reconnecting");
                self.disconnect().await;
            }
            None => {}
        }

        let dsn = self.params.to_dsn();
        let attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            log::debug!(
                "connecting to {} (attempt {}/{})",
                self.params,
                attempt,
                attempts
            );
            match self.connector.connect(&dsn).await {
                Ok(session) => {
                    log::debug!("connection established");
                    self.session = Some(session);
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("connection attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        log::info!(
                            "waiting {} before reconnecting",
                            humantime::format_duration(self.policy.delay)
                        );
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(PgError::ConnectionExhausted {
            attempts,
            last_error,
        })
    }

    /// Run a query and canonicalize its rows
    ///
    /// Connection exhaustion is propagated unchanged; every other failure is a
    /// [`PgError::QueryFailed`]. A failure that leaves the link unusable also
    /// drops the cached session.
    pub async fn run_query(
        &mut self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<RowSet> {
        self.ensure_connected().await?;

        let session = self.session.as_mut().ok_or_else(|| PgError::Connect {
            message: "no cached connection".to_string(),
        })?;

        log::debug!("running query: {}", query);
        let output = match session.query(query, params).await {
            Ok(output) => output,
            Err(e) => {
                let e = e.in_query(query);
                if e.is_link_fatal() {
                    log::debug!("dropping broken connection");
                    self.disconnect().await;
                }
                return Err(e);
            }
        };

        let rows = output
            .rows
            .iter()
            .map(|cells| Row::from_cells(&output.columns, cells))
            .collect::<PgResult<RowSet>>()
            .map_err(|e| e.in_query(query))?;

        log::debug!("query returned {} row(s)", rows.len());
        Ok(rows)
    }

    /// Close and forget the cached session, if any
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}
