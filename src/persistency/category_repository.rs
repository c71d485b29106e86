//! CategoryRepository: Handles categories table operations
use crate::models::{Category, Syncable};
use crate::persistency::local_store::LocalStore;
use crate::persistency::row_utils::get_uuid;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT id, name, color, icon, order_num, is_synced, is_deleted FROM categories";

#[derive(Clone)]
pub struct CategoryRepository {
    pool: Pool<Sqlite>,
}

impl CategoryRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn row_to_category(row: &SqliteRow) -> Result<Category> {
        Ok(Category {
            id: get_uuid(row, "id")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
            icon: row.try_get("icon")?,
            order_num: row.try_get("order_num")?,
            is_synced: row.try_get("is_synced")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

#[async_trait]
impl LocalStore<Category> for CategoryRepository {
    async fn find_by_sync_state(&self, is_synced: bool, is_deleted: bool) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_synced = ? AND is_deleted = ?",
            SELECT_COLUMNS
        ))
        .bind(is_synced)
        .bind(is_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_category).collect()
    }

    async fn save(&self, item: &Category) -> Result<()> {
        let (is_synced, is_deleted) = item.sync_state().flags();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO categories (
                id, name, color, icon, order_num, is_synced, is_deleted, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.color)
        .bind(&item.icon)
        .bind(item.order_num)
        .bind(is_synced)
        .bind(is_deleted)
        .execute(&self.pool)
        .await?;

        debug!("Saved category {} ({})", item.name, item.id);
        Ok(())
    }

    async fn mark_synced(&self, item: &Category) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET is_synced = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND is_synced = FALSE AND is_deleted = FALSE
              AND name = ? AND color = ? AND icon IS ? AND order_num = ?
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.color)
        .bind(&item.icon)
        .bind(item.order_num)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_deleted = FALSE ORDER BY order_num",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_category).collect()
    }

    async fn count_dirty(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE is_synced = FALSE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM categories").execute(&self.pool).await?;
        Ok(())
    }
}
