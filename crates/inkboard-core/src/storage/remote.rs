//! HTTP clients for the relay server's record store.

use super::{BoxFuture, StorageError, StorageResult, StoredStroke, StrokeRecord, StrokeStore};
use crate::config::RemoteConfig;
use crate::stroke::UserId;
use crate::whiteboard::{NewWhiteboard, Whiteboard, WhiteboardDirectory, WhiteboardId};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

fn build_client(config: &RemoteConfig) -> StorageResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| StorageError::Remote(format!("Failed to build HTTP client: {}", e)))
}

/// Decode a JSON response, mapping HTTP failures onto storage errors.
fn decode<T: DeserializeOwned>(response: Response, what: &str) -> StorageResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(StorageError::Remote(format!("{} returned {}: {}", what, status, body)));
    }
    response
        .json::<T>()
        .map_err(|e| StorageError::Serialization(format!("Invalid response for {}: {}", what, e)))
}

fn transport(e: reqwest::Error) -> StorageError {
    StorageError::Remote(e.to_string())
}

/// Stroke log served by `inkboard-server`.
pub struct RemoteStrokeStore {
    client: Client,
    base_url: String,
}

impl RemoteStrokeStore {
    pub fn new(config: &RemoteConfig) -> StorageResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.api_url(),
        })
    }

    fn strokes_url(&self, whiteboard_id: &WhiteboardId) -> String {
        format!("{}/whiteboards/{}/strokes", self.base_url, whiteboard_id)
    }
}

impl StrokeStore for RemoteStrokeStore {
    fn append(&self, record: StrokeRecord) -> BoxFuture<'_, StorageResult<StoredStroke>> {
        let url = self.strokes_url(&record.whiteboard_id);
        Box::pin(async move {
            let response = self.client.post(&url).json(&record).send().map_err(transport)?;
            decode(response, &url)
        })
    }

    fn list(&self, whiteboard_id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Vec<StoredStroke>>> {
        let url = self.strokes_url(whiteboard_id);
        Box::pin(async move {
            let response = self.client.get(&url).send().map_err(transport)?;
            decode(response, &url)
        })
    }
}

/// Whiteboard metadata served by `inkboard-server`.
pub struct RemoteDirectory {
    client: Client,
    base_url: String,
}

impl RemoteDirectory {
    pub fn new(config: &RemoteConfig) -> StorageResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.api_url(),
        })
    }
}

impl WhiteboardDirectory for RemoteDirectory {
    fn create(&self, owner: &UserId, title: Option<&str>) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let url = format!("{}/whiteboards", self.base_url);
        let body = NewWhiteboard {
            owner_id: owner.clone(),
            title: title.map(str::to_string),
        };
        Box::pin(async move {
            let response = self.client.post(&url).json(&body).send().map_err(transport)?;
            decode(response, &url)
        })
    }

    fn get(&self, id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let url = format!("{}/whiteboards/{}", self.base_url, id);
        Box::pin(async move {
            let response = self.client.get(&url).send().map_err(transport)?;
            decode(response, &url)
        })
    }
}
