//! Ivy sync daemon
//!
//! Host process that runs the sync coordinator, either once or periodically
//! until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use ivy_sync::app_state::AppState;
use ivy_sync::log_appender::setup_logging;
use ivy_sync::scheduler::SimpleTaskManager;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ivy-sync-daemon", version, about = "Synchronize the Ivy wallet with the backend")]
struct Args {
    /// Run a single sync pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let app_state = AppState::new().await.context("Failed to initialize app state")?;

    let log_level = app_state.project_config.settings.log_level_filter()?;
    setup_logging(&app_state.project_config.data_dir(), log_level)
        .await
        .context("Failed to setup logging")?;

    info!(
        "Database location: {}",
        app_state.persistency().db_path().display()
    );

    if app_state.session.get().is_none() {
        warn!("No user session, sync passes will be skipped until login");
    }

    if args.once {
        for report in app_state.coordinator.sync().await {
            info!("{}", report);
        }
        info!("All synced: {}", app_state.coordinator.is_synced().await?);
        return Ok(());
    }

    let mut task_manager = SimpleTaskManager::new();
    task_manager
        .start_sync_task(
            app_state.coordinator.clone(),
            app_state.project_config.settings.sync_config.sync_interval,
        )
        .await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    task_manager.shutdown().await;

    Ok(())
}
