use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::{Duration, Instant};

use crate::infrastructure::config::DatabaseConfig;

/// Connection pool errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseConnectionError {
    #[error("pool configuration error: {0}")]
    Configuration(String),

    #[error("database connection failed: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("health check failed: {0}")]
    HealthCheckFailed(String),
}

/// Postgres connection pool manager
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Connects eagerly and runs an initial health check
    pub async fn new(database_url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseConnectionError> {
        Self::validate_config(config)?;

        let pool = Self::pool_options(config)
            .connect(database_url)
            .await
            .map_err(DatabaseConnectionError::Connection)?;

        let connection = Self { pool };
        connection.health_check().await?;

        tracing::info!(
            "database pool ready - max: {}, min: {}",
            config.max_connections,
            config.min_connections
        );

        Ok(connection)
    }

    /// Builds a pool that only connects on first use
    pub fn lazy(database_url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseConnectionError> {
        Self::validate_config(config)?;
        let pool = Self::pool_options(config)
            .connect_lazy(database_url)
            .map_err(DatabaseConnectionError::Connection)?;
        Ok(Self { pool })
    }

    fn validate_config(config: &DatabaseConfig) -> Result<(), DatabaseConnectionError> {
        if config.min_connections > config.max_connections {
            return Err(DatabaseConnectionError::Configuration(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if config.max_connections == 0 {
            return Err(DatabaseConnectionError::Configuration(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if config.acquire_timeout_seconds == 0 {
            return Err(DatabaseConnectionError::Configuration(
                "acquire timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
            .test_before_acquire(config.test_before_acquire);

        if config.sqlx_logging {
            pool_options = pool_options.after_connect(|_conn, _meta| {
                Box::pin(async move {
                    tracing::debug!("new database connection established");
                    Ok(())
                })
            });
        }

        pool_options
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool, DatabaseConnectionError> {
        let start = Instant::now();

        let result = sqlx::query("SELECT 1 as health_check, version() as db_version")
            .fetch_one(&self.pool)
            .await;

        let elapsed = start.elapsed();
        match result {
            Ok(row) => {
                let version: String = row.get("db_version");
                tracing::debug!("database health check ok - {:?}, version: {}", elapsed, version);
                Ok(true)
            }
            Err(e) => {
                tracing::error!("database health check failed - {:?}, error: {:?}", elapsed, e);
                Err(DatabaseConnectionError::HealthCheckFailed(e.to_string()))
            }
        }
    }

    pub async fn close(&self) {
        tracing::info!("closing database pool...");
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::Config;

    #[test]
    fn test_validate_config() {
        let mut config = Config::default().database;
        assert!(DatabaseConnection::validate_config(&config).is_ok());

        config.min_connections = config.max_connections + 1;
        assert!(DatabaseConnection::validate_config(&config).is_err());

        config.min_connections = 0;
        config.max_connections = 0;
        assert!(DatabaseConnection::validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let mut config = Config::default().database;
        config.min_connections = 0;
        let connection = DatabaseConnection::lazy("postgresql://127.0.0.1:1/none", &config).unwrap();
        assert!(!connection.pool().is_closed());
    }
}
