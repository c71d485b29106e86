use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    auth::IvySession, config::ProjectConfig, ivy_service::HttpClient,
    persistency::PersistencyManager, sync::SyncCoordinator,
};

#[derive(Clone)]
pub struct AppState {
    pub project_config: Arc<ProjectConfig>,
    pub persistency_manager: Arc<PersistencyManager>,
    pub session: Arc<IvySession>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl AppState {
    /// Build everything from the user's project directories
    pub async fn new() -> Result<Self> {
        let project_config = ProjectConfig::new().await?;

        let persistency_manager = PersistencyManager::new(project_config.data_dir())
            .await
            .context("Failed to initialize persistency manager")?;
        persistency_manager
            .init_database()
            .await
            .context("Failed to initialize database schema")?;

        let session = Arc::new(IvySession::new(&project_config.config_dir()));
        session.load().context("Failed to load session")?;

        let http_client = HttpClient::new(&project_config.settings.server_url);
        let coordinator =
            SyncCoordinator::from_parts(&persistency_manager, http_client, session.clone());

        Ok(Self {
            project_config: Arc::new(project_config),
            persistency_manager: Arc::new(persistency_manager),
            session,
            coordinator: Arc::new(coordinator),
        })
    }

    pub fn persistency(&self) -> &PersistencyManager {
        &self.persistency_manager
    }
}
