//! Runs every entity syncer in dependency order
use crate::auth::{IvySession, SessionGuard};
use crate::ivy_service::{HttpClient, RestSyncService};
use crate::models::{Account, Budget, Category, EntityKind, Transaction};
use crate::persistency::{PersistencyManager, WatermarkStore};
use crate::sync::entity_sync::{EntitySync, EntitySyncer, SyncReport};
use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;

pub struct SyncCoordinator {
    syncers: Vec<Arc<dyn EntitySync>>,
    watermarks: Arc<dyn WatermarkStore>,
    session: Arc<IvySession>,
}

impl SyncCoordinator {
    pub fn new(
        syncers: Vec<Arc<dyn EntitySync>>,
        watermarks: Arc<dyn WatermarkStore>,
        session: Arc<IvySession>,
    ) -> Self {
        Self {
            syncers,
            watermarks,
            session,
        }
    }

    /// Wire the SQLite repositories and REST services of every entity type.
    /// Accounts and categories go first since transactions and budgets
    /// reference them.
    pub fn from_parts(
        persistency: &PersistencyManager,
        http_client: HttpClient,
        session: Arc<IvySession>,
    ) -> Self {
        let watermarks: Arc<dyn WatermarkStore> = Arc::new(persistency.sync_state_repository());
        let guard: Arc<dyn SessionGuard> = session.clone();

        let syncers: Vec<Arc<dyn EntitySync>> = vec![
            Arc::new(EntitySyncer::<Account>::new(
                Arc::new(persistency.account_repository()),
                Arc::new(RestSyncService::<Account>::new(http_client.clone(), session.clone())),
                watermarks.clone(),
                guard.clone(),
            )),
            Arc::new(EntitySyncer::<Category>::new(
                Arc::new(persistency.category_repository()),
                Arc::new(RestSyncService::<Category>::new(http_client.clone(), session.clone())),
                watermarks.clone(),
                guard.clone(),
            )),
            Arc::new(EntitySyncer::<Transaction>::new(
                Arc::new(persistency.transaction_repository()),
                Arc::new(RestSyncService::<Transaction>::new(http_client.clone(), session.clone())),
                watermarks.clone(),
                guard.clone(),
            )),
            Arc::new(EntitySyncer::<Budget>::new(
                Arc::new(persistency.budget_repository()),
                Arc::new(RestSyncService::<Budget>::new(http_client, session.clone())),
                watermarks.clone(),
                guard,
            )),
        ];

        Self::new(syncers, watermarks, session)
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.syncers.iter().map(|s| s.kind()).collect()
    }

    /// Sync every entity type; a failing one is logged and the rest still run
    pub async fn sync(&self) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(self.syncers.len());
        for syncer in &self.syncers {
            match syncer.sync().await {
                Ok(report) => reports.push(report),
                Err(e) => error!("{} sync failed: {:#}", syncer.kind(), e),
            }
        }
        info!(
            "Sync pass done: {}/{} entity types complete",
            reports.iter().filter(|r| r.is_complete()).count(),
            self.syncers.len()
        );
        reports
    }

    /// Sync a single entity type
    pub async fn sync_kind(&self, kind: EntityKind) -> Result<Option<SyncReport>> {
        match self.syncers.iter().find(|s| s.kind() == kind) {
            Some(syncer) => Ok(Some(syncer.sync().await?)),
            None => Ok(None),
        }
    }

    /// True when no entity type has pending local changes
    pub async fn is_synced(&self) -> Result<bool> {
        for syncer in &self.syncers {
            if !syncer.is_synced().await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Forget the user: session, local data and watermarks
    ///
    /// Passes already running finish first; passes started after the
    /// session is gone skip, so nothing is written back after the clear.
    pub async fn logout(&self) -> Result<()> {
        self.session.logout()?;
        for syncer in &self.syncers {
            syncer
                .clear_local()
                .await
                .with_context(|| format!("Failed to clear local {} data", syncer.kind()))?;
        }
        self.watermarks.clear_watermarks().await?;
        info!("Local data cleared after logout");
        Ok(())
    }
}
