use crate::models::EntityKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use sqlx::{Pool, Sqlite};

/// Durable per-entity last-sync timestamps (epoch seconds)
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Stored watermark, 0 when the entity was never synced
    async fn get_watermark(&self, kind: EntityKind) -> Result<i64>;
    async fn put_watermark(&self, kind: EntityKind, epoch_seconds: i64) -> Result<()>;
    async fn clear_watermarks(&self) -> Result<()>;
}

/// Database operations for sync state
#[derive(Clone)]
pub struct SyncStateRepository {
    pool: Pool<Sqlite>,
}

impl SyncStateRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Generic long value by key
    pub async fn get_long(&self, key: &str) -> Result<Option<i64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sync_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read sync state {}", key))?;
        Ok(value)
    }

    pub async fn put_long(&self, key: &str, value: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sync_state (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store sync state {}", key))?;

        debug!("Stored sync state: {}={}", key, value);
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for SyncStateRepository {
    async fn get_watermark(&self, kind: EntityKind) -> Result<i64> {
        Ok(self.get_long(&kind.watermark_key()).await?.unwrap_or(0))
    }

    async fn put_watermark(&self, kind: EntityKind, epoch_seconds: i64) -> Result<()> {
        self.put_long(&kind.watermark_key(), epoch_seconds).await
    }

    async fn clear_watermarks(&self) -> Result<()> {
        sqlx::query("DELETE FROM sync_state WHERE key LIKE 'LAST_SYNC_DATE_%'")
            .execute(&self.pool)
            .await?;
        info!("Cleared sync watermarks");
        Ok(())
    }
}
