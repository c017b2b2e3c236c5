use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Response, Url};
use std::time::Duration;
use tracing::debug;

use crate::errors::RemoteError;
use crate::models::{Fields, Record, RecordId};

/// CRUD access to the authoritative application store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Record>, RemoteError>;

    /// The store assigns the id.
    async fn create(&self, draft: &Fields) -> Result<Record, RemoteError>;

    /// Whole-record replace.
    async fn update(&self, id: &RecordId, record: &Record) -> Result<Record, RemoteError>;

    /// Deleting an id that is already gone counts as success.
    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError>;
}

// --- HTTP implementation ---

#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API URL '{}' cannot hold a path", base_url));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base_url, client })
    }

    fn item_url(&self, id: &RecordId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::http_status(status.as_u16(), body))
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch_all(&self) -> Result<Vec<Record>, RemoteError> {
        debug!(url = %self.base_url, "GET applications");
        let response = self.client.get(self.base_url.clone()).send().await?;
        let response = check_status(response).await?;
        decode(response).await
    }

    async fn create(&self, draft: &Fields) -> Result<Record, RemoteError> {
        debug!(url = %self.base_url, "POST application");
        let response = self
            .client
            .post(self.base_url.clone())
            .json(draft)
            .send()
            .await?;
        let response = check_status(response).await?;
        decode(response).await
    }

    async fn update(&self, id: &RecordId, record: &Record) -> Result<Record, RemoteError> {
        let url = self.item_url(id);
        debug!(%url, "PUT application");
        let response = self.client.put(url).json(record).send().await?;
        let response = check_status(response).await?;
        decode(response).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        let url = self.item_url(id);
        debug!(%url, "DELETE application");
        let response = self.client.delete(url).send().await?;
        match check_status(response).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(%id, "application already removed remotely");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
