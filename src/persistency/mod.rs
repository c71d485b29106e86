//! Persistency module for the Ivy sync engine
//!
//! Local SQLite storage of the synced entities and the sync watermarks,
//! using SQLx.

pub mod account_repository;
pub mod budget_repository;
pub mod category_repository;
pub mod local_store;
pub mod row_utils;
pub mod sync_state_repository;
pub mod transaction_repository;

use anyhow::{Context, Result};
use log::info;
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;

pub use local_store::LocalStore;
pub use sync_state_repository::WatermarkStore;

/// Database manager for the synced entities
pub struct PersistencyManager {
    pool: Pool<Sqlite>,
    db_path: PathBuf,
}

impl PersistencyManager {
    /// Create a new persistency manager with database connection pool
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join("ivy.db");

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&database_url)
            .await
            .context("Failed to connect to database")?;

        info!(
            "Initialized database connection pool at: {}",
            db_path.display()
        );

        Ok(Self { pool, db_path })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Initialize database schema (create tables if they don't exist)
    pub async fn init_database(&self) -> Result<()> {
        info!("Initializing database schema...");

        self.create_accounts_table().await?;
        self.create_categories_table().await?;
        self.create_transactions_table().await?;
        self.create_budgets_table().await?;
        self.create_sync_state_table().await?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    async fn create_accounts_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                currency TEXT,
                color INTEGER NOT NULL DEFAULT 0,
                icon TEXT,
                order_num REAL NOT NULL DEFAULT 0,
                include_in_balance BOOLEAN NOT NULL DEFAULT TRUE,
                is_synced BOOLEAN NOT NULL DEFAULT FALSE,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.create_sync_flags_index("accounts").await
    }

    async fn create_categories_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color INTEGER NOT NULL DEFAULT 0,
                icon TEXT,
                order_num REAL NOT NULL DEFAULT 0,
                is_synced BOOLEAN NOT NULL DEFAULT FALSE,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.create_sync_flags_index("categories").await
    }

    async fn create_transactions_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                transaction_type TEXT NOT NULL,
                amount REAL NOT NULL,
                to_account_id TEXT,
                to_amount REAL,
                title TEXT,
                description TEXT,
                date_time TEXT,
                category_id TEXT,
                due_date TEXT,
                recurring_rule_id TEXT,
                is_synced BOOLEAN NOT NULL DEFAULT FALSE,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_account_id ON transactions(account_id)",
        )
        .execute(&self.pool)
        .await?;

        self.create_sync_flags_index("transactions").await
    }

    async fn create_budgets_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS budgets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                category_ids_serialized TEXT,
                account_ids_serialized TEXT,
                order_id REAL NOT NULL DEFAULT 0,
                is_synced BOOLEAN NOT NULL DEFAULT FALSE,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.create_sync_flags_index("budgets").await
    }

    /// Create the sync_state table holding the per-entity watermarks
    async fn create_sync_state_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_sync_flags_index(&self, table: &str) -> Result<()> {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_sync_flags ON {table}(is_synced, is_deleted)"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn account_repository(&self) -> account_repository::AccountRepository {
        account_repository::AccountRepository::new(self.pool.clone())
    }

    pub fn category_repository(&self) -> category_repository::CategoryRepository {
        category_repository::CategoryRepository::new(self.pool.clone())
    }

    pub fn transaction_repository(&self) -> transaction_repository::TransactionRepository {
        transaction_repository::TransactionRepository::new(self.pool.clone())
    }

    pub fn budget_repository(&self) -> budget_repository::BudgetRepository {
        budget_repository::BudgetRepository::new(self.pool.clone())
    }

    pub fn sync_state_repository(&self) -> sync_state_repository::SyncStateRepository {
        sync_state_repository::SyncStateRepository::new(self.pool.clone())
    }
}

impl Drop for PersistencyManager {
    fn drop(&mut self) {
        info!("Closing database connection pool");
    }
}
