//! Periodic driver for the sync coordinator

use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use log::{info, warn};
use anyhow::Result;

use crate::sync::SyncCoordinator;

/// Task manager owning the background sync loop
pub struct SimpleTaskManager {
    shutdown_handles: Vec<JoinHandle<()>>,
}

impl SimpleTaskManager {
    pub fn new() -> Self {
        Self {
            shutdown_handles: Vec::new(),
        }
    }

    /// Start the sync task with overlap protection
    pub async fn start_sync_task(
        &mut self,
        coordinator: Arc<SyncCoordinator>,
        period: Duration,
    ) -> Result<()> {
        let sync_running = Arc::new(Mutex::new(()));
        let coordinator_weak: Weak<SyncCoordinator> = Arc::downgrade(&coordinator);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let Ok(guard) = sync_running.clone().try_lock_owned() else {
                    warn!("Sync pass still running, skipping this cycle");
                    continue;
                };

                // host dropped the coordinator: stop looping
                let Some(coordinator) = coordinator_weak.upgrade() else {
                    info!("Coordinator dropped, stopping sync task");
                    break;
                };

                tokio::spawn(async move {
                    let _guard = guard;
                    info!("Starting sync cycle");
                    let reports = coordinator.sync().await;
                    for report in reports.iter().filter(|r| !r.is_complete()) {
                        warn!("Incomplete: {}", report);
                    }
                });
            }
        });

        self.shutdown_handles.push(handle);
        info!("Sync task started, period {:?}", period);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_handles.iter().any(|h| !h.is_finished())
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        info!("Shutting down task manager...");

        for handle in self.shutdown_handles {
            handle.abort();
        }

        info!("Task manager shutdown complete");
    }
}

impl Default for SimpleTaskManager {
    fn default() -> Self {
        Self::new()
    }
}
