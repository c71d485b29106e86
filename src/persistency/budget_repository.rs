//! BudgetRepository: Handles budgets table operations
use crate::models::{Budget, Syncable};
use crate::persistency::local_store::LocalStore;
use crate::persistency::row_utils::get_uuid;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, amount, category_ids_serialized, account_ids_serialized, order_id,
           is_synced, is_deleted
    FROM budgets
"#;

#[derive(Clone)]
pub struct BudgetRepository {
    pool: Pool<Sqlite>,
}

impl BudgetRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        Ok(Budget {
            id: get_uuid(row, "id")?,
            name: row.try_get("name")?,
            amount: row.try_get("amount")?,
            category_ids_serialized: row.try_get("category_ids_serialized")?,
            account_ids_serialized: row.try_get("account_ids_serialized")?,
            order_id: row.try_get("order_id")?,
            is_synced: row.try_get("is_synced")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

#[async_trait]
impl LocalStore<Budget> for BudgetRepository {
    async fn find_by_sync_state(&self, is_synced: bool, is_deleted: bool) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_synced = ? AND is_deleted = ?",
            SELECT_COLUMNS
        ))
        .bind(is_synced)
        .bind(is_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    async fn save(&self, item: &Budget) -> Result<()> {
        let (is_synced, is_deleted) = item.sync_state().flags();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO budgets (
                id, name, amount, category_ids_serialized, account_ids_serialized, order_id,
                is_synced, is_deleted, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.amount)
        .bind(&item.category_ids_serialized)
        .bind(&item.account_ids_serialized)
        .bind(item.order_id)
        .bind(is_synced)
        .bind(is_deleted)
        .execute(&self.pool)
        .await?;

        debug!("Saved budget {} ({})", item.name, item.id);
        Ok(())
    }

    async fn mark_synced(&self, item: &Budget) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE budgets SET is_synced = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND is_synced = FALSE AND is_deleted = FALSE
              AND name = ? AND amount = ? AND category_ids_serialized IS ?
              AND account_ids_serialized IS ? AND order_id = ?
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.amount)
        .bind(&item.category_ids_serialized)
        .bind(&item.account_ids_serialized)
        .bind(item.order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Budget>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_deleted = FALSE ORDER BY order_id",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    async fn count_dirty(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM budgets WHERE is_synced = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM budgets").execute(&self.pool).await?;
        Ok(())
    }
}
