use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

static SESSION_FILE_NAME: &str = "session.json";

/// Answers whether a user is currently logged in
#[async_trait]
pub trait SessionGuard: Send + Sync {
    async fn is_logged_in(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub auth_token: String,
}

/// Current user session, persisted as json in the config directory
pub struct IvySession {
    current: RwLock<Option<Session>>,
    file_path: PathBuf,
}

impl IvySession {
    /// Create a session store backed by `session.json` in `config_dir`
    pub fn new(config_dir: &Path) -> Self {
        Self {
            current: RwLock::new(None),
            file_path: config_dir.join(SESSION_FILE_NAME),
        }
    }

    /// Restore a previously saved session; a missing file means logged out
    pub fn load(&self) -> Result<()> {
        if !self.file_path.exists() {
            debug!("No session file at {}", self.file_path.display());
            return Ok(());
        }
        let data = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let session: Session =
            serde_json::from_str(&data).context("Failed to parse session file")?;
        info!("Restored session for user {}", session.user_id);
        self.set(Some(session));
        Ok(())
    }

    pub fn login(&self, session: Session) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file_path, serde_json::to_string(&session)?)
            .context("Failed to store session")?;
        info!("Logged in as {}", session.user_id);
        self.set(Some(session));
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.set(None);
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to remove session file")?;
        }
        info!("Logged out");
        Ok(())
    }

    pub fn auth_token(&self) -> Option<String> {
        self.get().map(|s| s.auth_token)
    }

    pub fn get(&self) -> Option<Session> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, session: Option<Session>) {
        match self.current.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}

#[async_trait]
impl SessionGuard for IvySession {
    async fn is_logged_in(&self) -> bool {
        self.get().is_some()
    }
}
