//! Test database helpers.
//!
//! Integration tests against a real Postgres instance connect through
//! [`TestDatabase`]. The instance is located via `TEST_DB_*` environment
//! variables; between tests, data tables are truncated while the
//! migration ledger is left intact.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// The application tables, in an order that satisfies no FK in
/// particular: truncation cascades.
const DATA_TABLES: &[&str] = &[
    "answer",
    "response",
    "question_option",
    "question",
    "target_constraint",
    "comment",
    "report",
    "notification",
    "refresh_session",
    "token_blacklist",
    "survey",
    "user",
];

/// Connection settings for the test Postgres instance.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let env = |key: &str, fallback: &str| {
            std::env::var(key).unwrap_or_else(|_| fallback.to_string())
        };
        Self {
            host: env("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env("TEST_DB_USER", "unipoll_test"),
            password: env("TEST_DB_PASSWORD", "unipoll_test"),
            database: env("TEST_DB_NAME", "unipoll_test"),
        }
    }
}

impl TestDbConfig {
    /// Connection URL for the configured test database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// Connection URL for the maintenance `postgres` database, used to
    /// create and drop per-test databases.
    #[must_use]
    pub fn maintenance_url(&self) -> String {
        self.url_for("postgres")
    }

    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A live connection to a test database, with lifecycle helpers.
pub struct TestDatabase {
    conn: DatabaseConnection,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the shared test database from the environment.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with explicit settings.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        info!(database = %config.database, "Connected to test database");
        Ok(Self { conn, config })
    }

    /// Create a throwaway database with a unique name, for tests that
    /// cannot share state with parallel tests.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("unipoll_test_{}", &suffix[..8]);

        let admin = Database::connect(&config.maintenance_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %config.database, "Created test database");
        Self::with_config(config).await
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Truncate every application table. The `seaql_migrations` ledger
    /// survives so migrations are not re-run.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        for table in DATA_TABLES {
            self.conn
                .execute(Statement::from_string(
                    DatabaseBackend::Postgres,
                    format!("TRUNCATE TABLE \"{table}\" CASCADE"),
                ))
                .await?;
        }
        Ok(())
    }

    /// Close the connection and drop the database. Only meaningful for
    /// databases made by [`Self::create_unique`].
    pub async fn drop_database(self) -> Result<(), DbErr> {
        let config = self.config;
        self.conn.close().await?;

        let admin = Database::connect(&config.maintenance_url()).await?;
        // Kick lingering connections first or the drop will block.
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                    config.database
                ),
            ))
            .await
            .ok();
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %config.database, "Dropped test database");
        Ok(())
    }

    /// Run a closure against the shared test database, truncating the
    /// data tables afterwards regardless of outcome.
    pub async fn run_test<F, Fut, T>(f: F) -> Result<T, DbErr>
    where
        F: for<'a> FnOnce(&'a Self) -> Fut,
        Fut: std::future::Future<Output = Result<T, DbErr>>,
    {
        let db = Self::new().await?;
        let result = f(&db).await;
        db.cleanup().await?;
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_points_at_test_port() {
        let config = TestDbConfig::default();
        assert_eq!(config.port, 5433);
        assert_eq!(config.database, "unipoll_test");
    }

    #[test]
    fn test_urls() {
        let config = TestDbConfig {
            host: "db.local".to_string(),
            port: 5433,
            username: "u".to_string(),
            password: "p".to_string(),
            database: "unipoll_test".to_string(),
        };
        assert_eq!(
            config.database_url(),
            "postgres://u:p@db.local:5433/unipoll_test"
        );
        assert_eq!(config.maintenance_url(), "postgres://u:p@db.local:5433/postgres");
    }

    #[test]
    fn test_every_entity_table_is_truncated() {
        for table in [
            "user",
            "survey",
            "question",
            "question_option",
            "target_constraint",
            "response",
            "answer",
            "comment",
            "report",
            "refresh_session",
            "token_blacklist",
            "notification",
        ] {
            assert!(DATA_TABLES.contains(&table), "missing table: {table}");
        }
    }
}
