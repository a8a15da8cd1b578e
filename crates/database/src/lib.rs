use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;

pub use sqlx::Error;
pub use sqlx::Result;

// --- Driver Adapter Pattern ---
pub type Driver = Sqlite;
pub type Connection = sqlx::SqliteConnection;
pub type Pool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Infrastructure(sqlx::Error),
    #[error("Resource not found")]
    NotFound,
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),
    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            _ => {
                if let Some(db_err) = err.as_database_error() {
                    if let Some(code) = db_err.code() {
                        match code.as_ref() {
                            // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                            "2067" | "1555" => {
                                return RepositoryError::UniqueViolation(
                                    db_err.message().to_string(),
                                );
                            }
                            // SQLITE_CONSTRAINT_CHECK
                            "275" => {
                                return RepositoryError::CheckViolation(
                                    db_err.message().to_string(),
                                );
                            }
                            _ => {}
                        }
                    }
                }
                RepositoryError::Infrastructure(err)
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pub pool: Pool,
}

impl Database {
    pub async fn new(connection_string: &str) -> sqlx::Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await?;
        tracing::info!("Migrations complete.");
        Ok(())
    }

    pub async fn begin(&self) -> Result<UnitOfWork<'_>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }
}

pub struct UnitOfWork<'a> {
    tx: Transaction<'a, Driver>,
}

impl<'a> UnitOfWork<'a> {
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut *self.tx
    }
}

// do not add #[cfg(test)] here because it hides this method from libraries.
pub async fn get_test_db() -> Database {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

    // Unique file per test; tests in one binary run in parallel.
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let seq = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = std::env::temp_dir().join(format!("test_plotline_{}_{}.db", now, seq));
    let connection_string = format!("sqlite:{}", db_path.display());

    let options = SqliteConnectOptions::from_str(&connection_string).unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // Single connection is safer for SQLite tests
        .connect_with(options)
        .await
        .expect("Failed to create test database pool");

    let db = Database { pool };
    db.run_migrations().await.expect("Failed to run migrations");

    db
}
