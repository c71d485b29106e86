//! AccountRepository: Handles accounts table operations
use crate::models::{Account, Syncable};
use crate::persistency::local_store::LocalStore;
use crate::persistency::row_utils::get_uuid;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT id, name, currency, color, icon, order_num, include_in_balance, is_synced, is_deleted FROM accounts";

#[derive(Clone)]
pub struct AccountRepository {
    pool: Pool<Sqlite>,
}

impl AccountRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        Ok(Account {
            id: get_uuid(row, "id")?,
            name: row.try_get("name")?,
            currency: row.try_get("currency")?,
            color: row.try_get("color")?,
            icon: row.try_get("icon")?,
            order_num: row.try_get("order_num")?,
            include_in_balance: row.try_get("include_in_balance")?,
            is_synced: row.try_get("is_synced")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

#[async_trait]
impl LocalStore<Account> for AccountRepository {
    async fn find_by_sync_state(&self, is_synced: bool, is_deleted: bool) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_synced = ? AND is_deleted = ?",
            SELECT_COLUMNS
        ))
        .bind(is_synced)
        .bind(is_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_account).collect()
    }

    async fn save(&self, item: &Account) -> Result<()> {
        let (is_synced, is_deleted) = item.sync_state().flags();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO accounts (
                id, name, currency, color, icon, order_num, include_in_balance,
                is_synced, is_deleted, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(&item.currency)
        .bind(item.color)
        .bind(&item.icon)
        .bind(item.order_num)
        .bind(item.include_in_balance)
        .bind(is_synced)
        .bind(is_deleted)
        .execute(&self.pool)
        .await?;

        debug!("Saved account {} ({})", item.name, item.id);
        Ok(())
    }

    async fn mark_synced(&self, item: &Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET is_synced = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND is_synced = FALSE AND is_deleted = FALSE
              AND name = ? AND currency IS ? AND color = ? AND icon IS ?
              AND order_num = ? AND include_in_balance = ?
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(&item.currency)
        .bind(item.color)
        .bind(&item.icon)
        .bind(item.order_num)
        .bind(item.include_in_balance)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_deleted = FALSE ORDER BY order_num",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_account).collect()
    }

    async fn count_dirty(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE is_synced = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM accounts").execute(&self.pool).await?;
        Ok(())
    }
}
