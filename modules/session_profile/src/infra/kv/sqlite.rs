use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::{KvError, KvStore};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS kv_store (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

/// `kv_store` table on a shared SQLite pool; values are JSON text.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Wrap `pool`, creating the table when missing.
    pub async fn new(pool: SqlitePool) -> Result<Self, KvError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        debug!("kv_store table ready");
        Ok(Self { pool })
    }
}

fn decode(key: &str, raw: &str) -> Result<serde_json::Value, KvError> {
    serde_json::from_str(raw).map_err(|source| KvError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, KvError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        raw.map(|r| decode(key, &r)).transpose()
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), KvError> {
        let raw = serde_json::to_string(value).map_err(KvError::Encode)?;
        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let res = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<serde_json::Value>, KvError> {
        // substr instead of LIKE: '%' and '_' in keys stay literal.
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM kv_store WHERE substr(key, 1, length(?)) = ? ORDER BY key",
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(k, v)| decode(k, v)).collect()
    }
}
