use crate::auth::IvySession;
use crate::error::RemoteError;
use crate::ivy_service::http_client::HttpClient;
use crate::ivy_service::sync_models::RemoteEntity;
use crate::models::Syncable;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Remote side of the sync protocol for one entity type
#[async_trait]
pub trait RemoteSyncService<T: Syncable>: Send + Sync {
    /// Records changed on the server strictly after `after` (epoch seconds)
    async fn fetch(&self, after: i64) -> Result<Vec<T>>;

    /// Upsert; pushing the same record twice has the same effect as once
    async fn push(&self, item: &T) -> Result<()>;

    /// Delete by id; deleting an unknown id is not an error
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// REST implementation against the `/wallet/<collection>` endpoints
pub struct RestSyncService<T> {
    http_client: HttpClient,
    session: Arc<IvySession>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for RestSyncService<T> {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            session: self.session.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: RemoteEntity> RestSyncService<T> {
    pub fn new(http_client: HttpClient, session: Arc<IvySession>) -> Self {
        Self {
            http_client,
            session,
            _entity: PhantomData,
        }
    }

    fn collection_path() -> String {
        format!("/wallet/{}", T::KIND.collection())
    }

    fn auth_header(&self) -> Result<String, RemoteError> {
        let token = self
            .session
            .auth_token()
            .ok_or(RemoteError::NotAuthenticated)?;
        Ok(format!("Bearer {}", token))
    }
}

#[async_trait]
impl<T: RemoteEntity> RemoteSyncService<T> for RestSyncService<T> {
    async fn fetch(&self, after: i64) -> Result<Vec<T>> {
        let auth_header = self.auth_header()?;
        let mut response: HashMap<String, Vec<T::Dto>> = self
            .http_client
            .get(
                &Self::collection_path(),
                &[("after", after.to_string())],
                &auth_header,
            )
            .await
            .with_context(|| format!("Failed to fetch {} after {}", T::KIND.collection(), after))?;

        let items: Vec<T> = response
            .remove(T::KIND.collection())
            .unwrap_or_default()
            .into_iter()
            .map(T::from_dto)
            .collect();

        info!("Fetched {} {} after {}", items.len(), T::KIND.collection(), after);
        Ok(items)
    }

    async fn push(&self, item: &T) -> Result<()> {
        let auth_header = self.auth_header()?;
        let mut body = serde_json::Map::new();
        body.insert(
            T::KIND.as_str().to_string(),
            serde_json::to_value(item.to_dto())?,
        );

        self.http_client
            .post(&Self::collection_path(), &body, &auth_header)
            .await
            .with_context(|| format!("Failed to push {} {}", T::KIND, item.id()))?;

        debug!("Pushed {} {}", T::KIND, item.id());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let auth_header = self.auth_header()?;
        let path = format!("{}/{}", Self::collection_path(), id);

        match self.http_client.delete(&path, &auth_header).await {
            Ok(()) => {
                debug!("Deleted remote {} {}", T::KIND, id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Remote {} {} already gone", T::KIND, id);
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to delete {} {}", T::KIND, id))),
        }
    }
}
