//! Local storage contract consumed by the sync engine
use crate::models::Syncable;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Per-entity local table operations
///
/// Every call is a single statement, so each save or delete is atomic on its
/// own. Queries return snapshots, never live views.
#[async_trait]
pub trait LocalStore<T: Syncable>: Send + Sync {
    /// Records whose flags match exactly
    async fn find_by_sync_state(&self, is_synced: bool, is_deleted: bool) -> Result<Vec<T>>;

    /// Insert or replace by id
    async fn save(&self, item: &T) -> Result<()>;

    /// Flag a pushed record as clean, without touching its other columns.
    ///
    /// Only applies while the stored row is still the dirty-upsert that was
    /// pushed. Returns false when it was edited or deleted in the meantime,
    /// so the newer local state is kept and goes out on the next pass.
    async fn mark_synced(&self, item: &T) -> Result<bool>;

    /// Physically remove the row
    async fn delete_by_id(&self, id: Uuid) -> Result<()>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>>;

    /// All records that are not tombstoned
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Number of records waiting for upload or remote delete
    async fn count_dirty(&self) -> Result<i64>;

    async fn clear_all(&self) -> Result<()>;
}
