//! Plain HTTP calls for catalog queries that don't need a live connection.

use crate::catalog::FileMetadata;
use crate::error::SyncError;
use crate::protocol::transfer::{HeartbeatRequest, HeartbeatResponse};

pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn list_files(&self) -> Result<Vec<FileMetadata>, SyncError> {
        let url = format!("{}/files", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
        resp.json()
            .await
            .map_err(|e| SyncError::MalformedOp(e.to_string()))
    }

    pub async fn get_file_metadata(&self, name: &str) -> Result<Option<FileMetadata>, SyncError> {
        let url = format!("{}/files/{}", self.base_url, name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        resp.json()
            .await
            .map(Some)
            .map_err(|e| SyncError::MalformedOp(e.to_string()))
    }

    pub async fn health(&self) -> Result<bool, SyncError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&HeartbeatRequest {})
            .send()
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
        let body: HeartbeatResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::MalformedOp(e.to_string()))?;
        Ok(body.alive)
    }
}
