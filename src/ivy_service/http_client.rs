use crate::error::RemoteError;
use log::debug;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// HTTP client for the Ivy backend
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get full URL by prepending the server base if needed
    pub fn get_full_url(&self, path: &str) -> Result<Url, RemoteError> {
        let raw = if path.starts_with("http") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|_| RemoteError::InvalidUrl(raw))
    }

    async fn check(url: &Url, response: Result<Response, reqwest::Error>) -> Result<Response, RemoteError> {
        let response = response.map_err(|source| RemoteError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// Make a GET request with query parameters and decode the json body
    pub async fn get<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth_header: &str,
    ) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(path)?;
        debug!("GET {} {:?}", url, query);

        let result = self
            .client
            .get(url.clone())
            .query(query)
            .header("Authorization", auth_header)
            .send()
            .await;
        let response = Self::check(&url, result).await?;

        response
            .json::<T>()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Make a POST request with a json body; the response body is ignored
    pub async fn post<B>(&self, path: &str, body: &B, auth_header: &str) -> Result<(), RemoteError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.get_full_url(path)?;
        debug!("POST {}", url);

        let result = self
            .client
            .post(url.clone())
            .header("Authorization", auth_header)
            .json(body)
            .send()
            .await;
        Self::check(&url, result).await?;
        Ok(())
    }

    /// Make a DELETE request with authorization header
    pub async fn delete(&self, path: &str, auth_header: &str) -> Result<(), RemoteError> {
        let url = self.get_full_url(path)?;
        debug!("DELETE {}", url);

        let result = self
            .client
            .delete(url.clone())
            .header("Authorization", auth_header)
            .send()
            .await;
        Self::check(&url, result).await?;
        Ok(())
    }
}
