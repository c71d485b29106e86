use thiserror::Error;

/// Failures of a call against the Ivy backend
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("server responded with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid url {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }
}
