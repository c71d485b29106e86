//! TransactionRepository: Handles transactions table operations
use crate::models::{Syncable, Transaction, TransactionType};
use crate::persistency::local_store::LocalStore;
use crate::persistency::row_utils::{get_opt_uuid, get_uuid, opt_uuid_to_string};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    SELECT id, account_id, transaction_type, amount, to_account_id, to_amount, title,
           description, date_time, category_id, due_date, recurring_rule_id,
           is_synced, is_deleted
    FROM transactions
"#;

#[derive(Clone)]
pub struct TransactionRepository {
    pool: Pool<Sqlite>,
}

impl TransactionRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let type_str: String = row.try_get("transaction_type")?;
        let transaction_type = TransactionType::from_str(&type_str)
            .ok_or_else(|| anyhow!("Unknown transaction type: {}", type_str))?;
        let date_time: Option<DateTime<Utc>> = row.try_get("date_time")?;
        let due_date: Option<DateTime<Utc>> = row.try_get("due_date")?;

        Ok(Transaction {
            id: get_uuid(row, "id")?,
            account_id: get_uuid(row, "account_id")?,
            transaction_type,
            amount: row.try_get("amount")?,
            to_account_id: get_opt_uuid(row, "to_account_id")?,
            to_amount: row.try_get("to_amount")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            date_time,
            category_id: get_opt_uuid(row, "category_id")?,
            due_date,
            recurring_rule_id: get_opt_uuid(row, "recurring_rule_id")?,
            is_synced: row.try_get("is_synced")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }

    /// Non-deleted transactions of one account, newest first
    pub async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "{} WHERE account_id = ? AND is_deleted = FALSE ORDER BY date_time DESC",
            SELECT_COLUMNS
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }
}

#[async_trait]
impl LocalStore<Transaction> for TransactionRepository {
    async fn find_by_sync_state(
        &self,
        is_synced: bool,
        is_deleted: bool,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_synced = ? AND is_deleted = ?",
            SELECT_COLUMNS
        ))
        .bind(is_synced)
        .bind(is_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn save(&self, item: &Transaction) -> Result<()> {
        let (is_synced, is_deleted) = item.sync_state().flags();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO transactions (
                id, account_id, transaction_type, amount, to_account_id, to_amount, title,
                description, date_time, category_id, due_date, recurring_rule_id,
                is_synced, is_deleted, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.account_id.to_string())
        .bind(item.transaction_type.as_str())
        .bind(item.amount)
        .bind(opt_uuid_to_string(item.to_account_id))
        .bind(item.to_amount)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.date_time)
        .bind(opt_uuid_to_string(item.category_id))
        .bind(item.due_date)
        .bind(opt_uuid_to_string(item.recurring_rule_id))
        .bind(is_synced)
        .bind(is_deleted)
        .execute(&self.pool)
        .await?;

        debug!(
            "Saved transaction {} ({} {})",
            item.id,
            item.transaction_type.as_str(),
            item.amount
        );
        Ok(())
    }

    async fn mark_synced(&self, item: &Transaction) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET is_synced = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND is_synced = FALSE AND is_deleted = FALSE
              AND account_id = ? AND transaction_type = ? AND amount = ?
              AND to_account_id IS ? AND to_amount IS ? AND title IS ?
              AND description IS ? AND date_time IS ? AND category_id IS ?
              AND due_date IS ? AND recurring_rule_id IS ?
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.account_id.to_string())
        .bind(item.transaction_type.as_str())
        .bind(item.amount)
        .bind(opt_uuid_to_string(item.to_account_id))
        .bind(item.to_amount)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.date_time)
        .bind(opt_uuid_to_string(item.category_id))
        .bind(item.due_date)
        .bind(opt_uuid_to_string(item.recurring_rule_id))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_deleted = FALSE ORDER BY date_time DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn count_dirty(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE is_synced = FALSE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
