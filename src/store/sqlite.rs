use super::{ConfigStore, StoreFuture, VersionedValue};
use crate::error::StoreError;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// SQLite-backed config store using sqlx async pool.
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

const CONFIG_TABLE: &str = "
CREATE TABLE IF NOT EXISTS config (
    key     TEXT PRIMARY KEY,
    value   TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
)";

impl SqliteConfigStore {
    /// Open (or create) the database file at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Open(format!(
                    "failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .map_err(|e| StoreError::Open(format!("{}: {e}", db_path.display())))?;

        Self::new(pool).await
    }

    /// Create a new store with an existing pool and ensure the schema.
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(CONFIG_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ConfigStore for SqliteConfigStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<VersionedValue>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT value, version FROM config WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

            row.map(|row| -> Result<VersionedValue, StoreError> {
                Ok(VersionedValue {
                    value: row.try_get("value")?,
                    version: row.try_get("version")?,
                })
            })
            .transpose()
        })
    }

    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO config (key, value, version) VALUES ($1, $2, 1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = config.version + 1",
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected_version: Option<i64>,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = match expected_version {
                None => {
                    sqlx::query(
                        "INSERT INTO config (key, value, version) VALUES ($1, $2, 1)
                         ON CONFLICT(key) DO NOTHING",
                    )
                    .bind(key)
                    .bind(value)
                    .execute(&self.pool)
                    .await?
                }
                Some(version) => {
                    sqlx::query(
                        "UPDATE config SET value = $1, version = version + 1
                         WHERE key = $2 AND version = $3",
                    )
                    .bind(value)
                    .bind(key)
                    .bind(version)
                    .execute(&self.pool)
                    .await?
                }
            };
            Ok(result.rows_affected() == 1)
        })
    }
}
