//! Testcontainers PostgreSQL fixture
//!
//! Starts a throwaway PostgreSQL server for integration tests (requires
//! Docker). Set `SKIP_DOCKER_TESTS` to skip those tests on machines without it.
//!
//! ```rust,ignore
//! use pgtester::pgtester::test_harness::infra::PostgresInfra;
//!
//! #[tokio::test]
//! async fn test_against_postgres() {
//!     let mut infra = PostgresInfra::start().await.unwrap();
//!     let params = infra.connection_parameters().clone();
//!     // ... run tests
//!     infra.stop().await.unwrap();
//! }
//! ```

use super::error::{TestHarnessError, TestHarnessResult};
use crate::pgtester::pg::ConnectionParameters;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

const POSTGRES_PORT: u16 = 5432;
const POSTGRES_USER: &str = "postgres";
const POSTGRES_PASSWORD: &str = "postgres";
const POSTGRES_DB: &str = "postgres";

/// Environment variable that disables container-backed tests
pub const SKIP_DOCKER_ENV: &str = "SKIP_DOCKER_TESTS";

/// Whether container-backed tests should be skipped
pub fn docker_tests_disabled() -> bool {
    std::env::var_os(SKIP_DOCKER_ENV).is_some()
}

/// A running PostgreSQL container and the parameters to reach it
pub struct PostgresInfra {
    container: Option<ContainerAsync<Postgres>>,
    params: ConnectionParameters,
}

impl PostgresInfra {
    /// Start a PostgreSQL container and wait until it accepts connections
    pub async fn start() -> TestHarnessResult<Self> {
        log::info!("Starting PostgreSQL container via testcontainers...");

        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .start()
            .await
            .map_err(|e| TestHarnessError::InfraError {
                message: "Failed to start PostgreSQL container".to_string(),
                source: Some(e.to_string()),
            })?;

        let host_port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(|e| TestHarnessError::InfraError {
                message: "Failed to get PostgreSQL port".to_string(),
                source: Some(e.to_string()),
            })?;

        let params = ConnectionParameters::new()
            .with("host", "127.0.0.1")
            .with("port", host_port.to_string())
            .with("user", POSTGRES_USER)
            .with("password", POSTGRES_PASSWORD)
            .with("dbname", POSTGRES_DB);

        log::info!("PostgreSQL container started: {}", params);

        Ok(Self {
            container: Some(container),
            params,
        })
    }

    pub fn connection_parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Stop and remove the container
    pub async fn stop(&mut self) -> TestHarnessResult<()> {
        if let Some(container) = self.container.take() {
            log::info!("Stopping PostgreSQL container...");
            if let Err(e) = container.stop().await {
                log::warn!("Failed to stop PostgreSQL container: {}", e);
            }
            container.rm().await.map_err(|e| TestHarnessError::InfraError {
                message: "Failed to remove PostgreSQL container".to_string(),
                source: Some(e.to_string()),
            })?;
            log::info!("PostgreSQL container stopped and removed");
        }
        Ok(())
    }
}
