pub mod connection;
pub mod business_repository;
pub mod filing_repository;
pub mod invitation_repository;
pub mod reminder_repository;
pub mod user_repository;

use sqlx::{PgPool, Row};

use crate::infrastructure::config::Config;
use crate::shared::AppError;
use connection::{DatabaseConnection, DatabaseConnectionError};

pub use business_repository::BusinessRepository;
pub use filing_repository::FilingRepository;
pub use invitation_repository::{InvitationRepository, InvitationSearch, InvitationSearchRow};
pub use reminder_repository::ReminderRepository;
pub use user_repository::UserRepository;

/// Database errors raised outside request handling
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("connection manager error: {0}")]
    ConnectionManager(#[from] DatabaseConnectionError),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Logs a query failure and wraps it
pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    tracing::error!("database query error: {}", e);
    AppError::Database(e)
}

/// Database manager: the pool plus one repository per record type
#[derive(Debug, Clone)]
pub struct Database {
    connection_manager: DatabaseConnection,
    pub businesses: BusinessRepository,
    pub filings: FilingRepository,
    pub invitations: InvitationRepository,
    pub reminders: ReminderRepository,
    pub users: UserRepository,
}

impl Database {
    /// Connects using the service configuration
    pub async fn new(config: &Config) -> Result<Self, DatabaseError> {
        let connection_manager = DatabaseConnection::new(&config.database_url, &config.database).await?;
        Ok(Self::from_connection(connection_manager))
    }

    /// Pool that connects on first query
    pub fn lazy(config: &Config) -> Result<Self, DatabaseError> {
        let connection_manager = DatabaseConnection::lazy(&config.database_url, &config.database)?;
        Ok(Self::from_connection(connection_manager))
    }

    fn from_connection(connection_manager: DatabaseConnection) -> Self {
        let pool = connection_manager.pool().clone();
        Database {
            businesses: BusinessRepository::new(pool.clone()),
            filings: FilingRepository::new(pool.clone()),
            invitations: InvitationRepository::new(pool.clone()),
            reminders: ReminderRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            connection_manager,
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.connection_manager.pool()
    }

    pub async fn health_check(&self) -> Result<bool, DatabaseError> {
        self.connection_manager
            .health_check()
            .await
            .map_err(DatabaseError::ConnectionManager)
    }

    /// Applies the embedded migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(self.pool()).await?;
        Ok(())
    }

    /// Whether the schema has been created
    pub async fn check_migrations(&self) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "SELECT COUNT(*) as migration_count FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = 'filing'",
        )
        .fetch_one(self.pool())
        .await?;

        let count: i64 = result.get("migration_count");
        Ok(count > 0)
    }

    pub async fn close(&self) {
        self.connection_manager.close().await;
    }
}
