pub mod http_client;
pub mod rest_sync_service;
pub mod sync_models;

pub use http_client::HttpClient;
pub use rest_sync_service::{RemoteSyncService, RestSyncService};
pub use sync_models::RemoteEntity;
