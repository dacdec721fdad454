use async_trait::async_trait;
use quoteit_core::{CoreError, DatabaseError, LedgerCategory};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};


/// Durable record of what the bot has already acted on, plus the blacklist.
///
/// `add` is an idempotent insert: recording the same id twice is a no-op and
/// never makes `has` report the id as absent.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn has(&self, category: LedgerCategory, item_id: &str) -> Result<bool, CoreError>;

    async fn add(&self, category: LedgerCategory, item_id: &str) -> Result<(), CoreError>;

    async fn blacklist_user(&self, username: &str) -> Result<(), CoreError>;

    async fn is_blacklisted(&self, username: &str) -> Result<bool, CoreError>;
}

pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: format!("{}: {}", self.connection_string, e),
                })
            })?
            .create_if_missing(true);

        // The polling loop is the only writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?;

        info!("Connected to ledger database at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(|e| {
                CoreError::Database(DatabaseError::MigrationFailed {
                    migration: e.to_string(),
                })
            })?;

        debug!("Ledger migrations applied");
        Ok(())
    }

    /// Number of ids recorded under a category.
    pub async fn count(&self, category: LedgerCategory) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger WHERE category = ?")
            .bind(category.as_str())
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        Ok(count)
    }

    pub async fn blacklist_size(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blacklist")
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        Ok(count)
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool.as_ref().ok_or_else(|| {
            CoreError::Database(DatabaseError::ConnectionFailed {
                reason: "database not connected".to_string(),
            })
        })
    }
}

#[async_trait]
impl Ledger for Database {
    async fn has(&self, category: LedgerCategory, item_id: &str) -> Result<bool, CoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM ledger WHERE category = ? AND item_id = ? LIMIT 1")
                .bind(category.as_str())
                .bind(item_id)
                .fetch_optional(self.pool()?)
                .await
                .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        Ok(found.is_some())
    }

    async fn add(&self, category: LedgerCategory, item_id: &str) -> Result<(), CoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO ledger (category, item_id, recorded_at) VALUES (?, ?, ?)",
        )
        .bind(category.as_str())
        .bind(item_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool()?)
        .await
        .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;

        if result.rows_affected() == 0 {
            debug!("{} already recorded as {}", item_id, category);
        } else {
            debug!("Recorded {} as {}", item_id, category);
        }
        Ok(())
    }

    async fn blacklist_user(&self, username: &str) -> Result<(), CoreError> {
        sqlx::query("INSERT OR IGNORE INTO blacklist (username, added_at) VALUES (?, ?)")
            .bind(username)
            .bind(chrono::Utc::now().timestamp())
            .execute(self.pool()?)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;

        info!("Blacklisted user {}", username);
        Ok(())
    }

    async fn is_blacklisted(&self, username: &str) -> Result<bool, CoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM blacklist WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(self.pool()?)
                .await
                .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        Ok(found.is_some())
    }
}
