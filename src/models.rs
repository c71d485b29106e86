//! Domain entities mirrored between the local database and the Ivy backend.
//!
//! Every entity carries the two sync flags (`is_synced`, `is_deleted`).
//! The sync engine only looks at those flags and the id; all the other fields
//! are opaque payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity types handled by the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Category,
    Transaction,
    Budget,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Account,
        EntityKind::Category,
        EntityKind::Transaction,
        EntityKind::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Category => "category",
            EntityKind::Transaction => "transaction",
            EntityKind::Budget => "budget",
        }
    }

    /// Plural name used for the REST collection and the response envelope
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Account => "accounts",
            EntityKind::Category => "categories",
            EntityKind::Transaction => "transactions",
            EntityKind::Budget => "budgets",
        }
    }

    /// Key of the last-sync watermark in the sync_state table
    pub fn watermark_key(&self) -> String {
        format!("LAST_SYNC_DATE_{}", self.collection().to_uppercase())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical sync state derived from the two persisted flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Mirrored to remote
    Clean,
    /// Local insert or edit waiting for upload
    DirtyUpsert,
    /// Tombstone waiting for remote delete
    DirtyDelete,
}

impl SyncState {
    pub fn from_flags(is_synced: bool, is_deleted: bool) -> Self {
        match (is_synced, is_deleted) {
            (true, false) => SyncState::Clean,
            (false, false) => SyncState::DirtyUpsert,
            // synced + deleted is not a legal combination; keep pushing the delete
            (_, true) => SyncState::DirtyDelete,
        }
    }

    pub fn flags(&self) -> (bool, bool) {
        match self {
            SyncState::Clean => (true, false),
            SyncState::DirtyUpsert => (false, false),
            SyncState::DirtyDelete => (false, true),
        }
    }
}

/// Common behaviour of every record the sync engine can reconcile
pub trait Syncable: Clone + std::fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;
    fn is_synced(&self) -> bool;
    fn is_deleted(&self) -> bool;
    fn set_sync_flags(&mut self, is_synced: bool, is_deleted: bool);

    fn sync_state(&self) -> SyncState {
        SyncState::from_flags(self.is_synced(), self.is_deleted())
    }

    /// Local edit: clean -> dirty-upsert
    fn mark_edited(&mut self) {
        if !self.is_deleted() {
            self.set_sync_flags(false, false);
        }
    }

    /// Local delete: clean or dirty-upsert -> dirty-delete
    fn mark_deleted(&mut self) {
        self.set_sync_flags(false, true);
    }

    /// Copy of the record as confirmed by the remote
    fn synced(&self) -> Self {
        let mut item = self.clone();
        item.set_sync_flags(true, false);
        item
    }
}

macro_rules! impl_syncable {
    ($ty:ty, $kind:expr) => {
        impl Syncable for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn is_synced(&self) -> bool {
                self.is_synced
            }

            fn is_deleted(&self) -> bool {
                self.is_deleted
            }

            fn set_sync_flags(&mut self, is_synced: bool, is_deleted: bool) {
                self.is_synced = is_synced;
                self.is_deleted = is_deleted;
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub currency: Option<String>,
    pub color: i32,
    pub icon: Option<String>,
    pub order_num: f64,
    pub include_in_balance: bool,
    pub is_synced: bool,
    pub is_deleted: bool,
}

impl Account {
    /// New local account, dirty until uploaded
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            currency: None,
            color: 0,
            icon: None,
            order_num: 0.0,
            include_in_balance: true,
            is_synced: false,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color: i32,
    pub icon: Option<String>,
    pub order_num: f64,
    pub is_synced: bool,
    pub is_deleted: bool,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: 0,
            icon: None,
            order_num: 0.0,
            is_synced: false,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub to_account_id: Option<Uuid>,
    pub to_amount: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub recurring_rule_id: Option<Uuid>,
    pub is_synced: bool,
    pub is_deleted: bool,
}

impl Transaction {
    pub fn new(account_id: Uuid, transaction_type: TransactionType, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_type,
            amount,
            to_account_id: None,
            to_amount: None,
            title: None,
            description: None,
            date_time: Some(Utc::now()),
            category_id: None,
            due_date: None,
            recurring_rule_id: None,
            is_synced: false,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub category_ids_serialized: Option<String>,
    pub account_ids_serialized: Option<String>,
    pub order_id: f64,
    pub is_synced: bool,
    pub is_deleted: bool,
}

impl Budget {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            category_ids_serialized: None,
            account_ids_serialized: None,
            order_id: 0.0,
            is_synced: false,
            is_deleted: false,
        }
    }
}

impl_syncable!(Account, EntityKind::Account);
impl_syncable!(Category, EntityKind::Category);
impl_syncable!(Transaction, EntityKind::Transaction);
impl_syncable!(Budget, EntityKind::Budget);
