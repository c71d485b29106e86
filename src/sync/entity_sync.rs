//! Three-phase reconciliation of one entity type
//!
//! A pass uploads dirty records, pushes tombstone deletes, then fetches
//! everything the server changed after the stored watermark. Remote failures
//! are contained per record; the next pass is the retry.

use crate::auth::SessionGuard;
use crate::ivy_service::RemoteSyncService;
use crate::models::{EntityKind, Syncable};
use crate::persistency::{LocalStore, WatermarkStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Source of the current time in epoch seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotLoggedIn,
    AlreadyRunning,
}

/// Outcome of a single `sync()` pass
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub kind: EntityKind,
    pub skipped: Option<SkipReason>,
    pub uploaded: usize,
    pub upload_failed: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub fetched: usize,
    pub fetch_failed: bool,
    /// New watermark, `None` when it was left untouched
    pub watermark: Option<i64>,
}

impl SyncReport {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            skipped: None,
            uploaded: 0,
            upload_failed: 0,
            deleted: 0,
            delete_failed: 0,
            fetched: 0,
            fetch_failed: false,
            watermark: None,
        }
    }

    fn skipped(kind: EntityKind, reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(kind)
        }
    }

    /// Every dirty record round-tripped and the fetch succeeded
    pub fn is_complete(&self) -> bool {
        self.skipped.is_none()
            && self.upload_failed == 0
            && self.delete_failed == 0
            && !self.fetch_failed
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(reason) = self.skipped {
            return write!(f, "{} skipped ({:?})", self.kind, reason);
        }
        write!(
            f,
            "{}: uploaded {} (failed {}), deleted {} (failed {}), fetched {}{}",
            self.kind,
            self.uploaded,
            self.upload_failed,
            self.deleted,
            self.delete_failed,
            self.fetched,
            if self.fetch_failed { ", fetch failed" } else { "" }
        )
    }
}

/// Type-erased view of a syncer, used by the coordinator
#[async_trait]
pub trait EntitySync: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn sync(&self) -> Result<SyncReport>;

    /// True when nothing is waiting for upload or remote delete; local only
    async fn is_synced(&self) -> Result<bool>;

    /// Drop every local record of this entity type, once any running pass
    /// has finished
    async fn clear_local(&self) -> Result<()>;
}

/// Sync engine for one entity type
pub struct EntitySyncer<T: Syncable> {
    local: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteSyncService<T>>,
    watermarks: Arc<dyn WatermarkStore>,
    session: Arc<dyn SessionGuard>,
    clock: Clock,
    running: Mutex<()>,
}

impl<T: Syncable> EntitySyncer<T> {
    pub fn new(
        local: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteSyncService<T>>,
        watermarks: Arc<dyn WatermarkStore>,
        session: Arc<dyn SessionGuard>,
    ) -> Self {
        Self {
            local,
            remote,
            watermarks,
            session,
            clock: system_clock(),
            running: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one full pass
    ///
    /// Returns `Err` only when the local database fails while reading the
    /// dirty sets or the watermark; remote failures end up in the report.
    pub async fn sync(&self) -> Result<SyncReport> {
        let kind = T::KIND;

        let Ok(_guard) = self.running.try_lock() else {
            warn!("{} sync still running, skipping this pass", kind);
            return Ok(SyncReport::skipped(kind, SkipReason::AlreadyRunning));
        };

        // checked under the lock so a logout cannot slip in between
        if !self.session.is_logged_in().await {
            debug!("Not logged in, skipping {} sync", kind);
            return Ok(SyncReport::skipped(kind, SkipReason::NotLoggedIn));
        }

        let sync_start = (self.clock)();
        let mut report = SyncReport::new(kind);

        self.upload_updated(&mut report).await?;
        self.delete_deleted(&mut report).await?;
        let after = self.fetch_new(&mut report).await?;

        if report.fetch_failed {
            warn!("{} fetch failed, keeping watermark at {}", kind, after);
        } else {
            let watermark = sync_start.max(after);
            self.watermarks
                .put_watermark(kind, watermark)
                .await
                .with_context(|| format!("Failed to store {} watermark", kind))?;
            report.watermark = Some(watermark);
        }

        info!("Sync finished - {}", report);
        Ok(report)
    }

    async fn upload_updated(&self, report: &mut SyncReport) -> Result<()> {
        let to_sync = self
            .local
            .find_by_sync_state(false, false)
            .await
            .with_context(|| format!("Failed to read dirty {} records", T::KIND))?;

        for item in to_sync {
            if let Err(e) = self.remote.push(&item).await {
                warn!("Upload of {} {} failed: {:#}", T::KIND, item.id(), e);
                report.upload_failed += 1;
                continue;
            }
            match self.local.mark_synced(&item).await {
                Ok(marked) => {
                    if !marked {
                        debug!("{} {} changed during upload, left dirty", T::KIND, item.id());
                    }
                    report.uploaded += 1;
                }
                Err(e) => {
                    // stays dirty and is pushed again next pass
                    error!("Failed to mark {} {} as synced: {:#}", T::KIND, item.id(), e);
                    report.upload_failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn delete_deleted(&self, report: &mut SyncReport) -> Result<()> {
        let to_delete = self
            .local
            .find_by_sync_state(false, true)
            .await
            .with_context(|| format!("Failed to read deleted {} records", T::KIND))?;

        for item in to_delete {
            let id = item.id();
            if let Err(e) = self.remote.delete(id).await {
                warn!("Remote delete of {} {} failed: {:#}", T::KIND, id, e);
                report.delete_failed += 1;
                continue;
            }
            match self.local.delete_by_id(id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    error!("Failed to remove {} tombstone {}: {:#}", T::KIND, id, e);
                    report.delete_failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Returns the watermark the fetch window started from
    async fn fetch_new(&self, report: &mut SyncReport) -> Result<i64> {
        let after = self
            .watermarks
            .get_watermark(T::KIND)
            .await
            .with_context(|| format!("Failed to read {} watermark", T::KIND))?;

        let items = match self.remote.fetch(after).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Fetch of {} after {} failed: {:#}", T::KIND, after, e);
                report.fetch_failed = true;
                return Ok(after);
            }
        };

        for item in items {
            match self.local.save(&item.synced()).await {
                Ok(()) => report.fetched += 1,
                Err(e) => {
                    error!("Failed to store fetched {} {}: {:#}", T::KIND, item.id(), e);
                    report.fetch_failed = true;
                }
            }
        }
        Ok(after)
    }

    /// True iff no record is dirty-upsert or dirty-delete
    pub async fn is_synced(&self) -> Result<bool> {
        Ok(self.local.find_by_sync_state(false, false).await?.is_empty()
            && self.local.find_by_sync_state(false, true).await?.is_empty())
    }
}

#[async_trait]
impl<T: Syncable> EntitySync for EntitySyncer<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    async fn sync(&self) -> Result<SyncReport> {
        EntitySyncer::<T>::sync(self).await
    }

    async fn is_synced(&self) -> Result<bool> {
        EntitySyncer::<T>::is_synced(self).await
    }

    async fn clear_local(&self) -> Result<()> {
        // wait for an in-flight pass so it cannot write after the clear
        let _guard = self.running.lock().await;
        self.local.clear_all().await
    }
}
