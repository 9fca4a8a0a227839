//! REST clients for a hosted realtime database and its object storage.
//!
//! Database paths map to `{base}/{path}.json`; a POST to a collection creates
//! a child under a server-generated push key and answers `{"name": key}`.
//! Subscriptions use the streaming endpoint (`Accept: text/event-stream`):
//! every `put`/`patch` event triggers a re-read of the whole collection.

use super::{BlobStore, BookSnapshots, RemoteStore};
use crate::error::ShelfError;
use crate::types::{RemoteBook, RemoteEntry, RemoteUser};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = "shelfbank/0.1";

/// HTTP client for one-shot calls. `timeout_secs` bounds the whole request.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ShelfError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()?;
    Ok(client)
}

/// HTTP client for long-lived event streams; only connecting is bounded.
fn build_stream_client() -> Result<reqwest::Client, ShelfError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    Ok(client)
}

/// Append `segments` to `base`, leaving the last one to the caller's suffix.
fn append_segments(base: &Url, segments: &[&str], last_suffix: &str) -> Result<Url, ShelfError> {
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            ShelfError::Misconfigured(format!("`{base}` cannot be used as a base URL"))
        })?;
        path.pop_if_empty();
        if let Some((last, parents)) = segments.split_last() {
            path.extend(parents);
            path.push(&format!("{last}{last_suffix}"));
        }
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Clone)]
pub struct RestRemote {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base: Url,
    auth_token: Option<String>,
}

impl RestRemote {
    pub fn new(client: reqwest::Client, base: Url, auth_token: Option<String>) -> Self {
        let stream_client = build_stream_client().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to the request client for event streams");
            client.clone()
        });
        Self {
            client,
            stream_client,
            base,
            auth_token,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ShelfError> {
        let mut url = append_segments(&self.base, segments, ".json")?;
        if let Some(token) = self.auth_token.as_deref() {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    fn collect(map: Option<BTreeMap<String, RemoteBook>>) -> Vec<RemoteEntry> {
        map.unwrap_or_default()
            .into_iter()
            .map(|(key, book)| RemoteEntry::new(key, book))
            .collect()
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn save_user(&self, uid: &str, user: &RemoteUser) -> Result<(), ShelfError> {
        self.client
            .put(self.url(&["users", uid])?)
            .json(user)
            .send()
            .await?
            .error_for_status()?;
        info!(uid, "remote profile saved");
        Ok(())
    }

    async fn update_balance(&self, uid: &str, balance: f64) -> Result<(), ShelfError> {
        self.client
            .put(self.url(&["users", uid, "balance"])?)
            .json(&balance)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_balance(&self, uid: &str) -> Result<Option<f64>, ShelfError> {
        let balance = self
            .client
            .get(self.url(&["users", uid, "balance"])?)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<f64>>()
            .await?;
        Ok(balance)
    }

    async fn push_book(&self, uid: &str, book: &RemoteBook) -> Result<String, ShelfError> {
        let resp: PushResponse = self
            .client
            .post(self.url(&["books", uid])?)
            .json(book)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(uid, key = %resp.name, "remote book created");
        Ok(resp.name)
    }

    async fn get_book(&self, uid: &str, key: &str) -> Result<Option<RemoteBook>, ShelfError> {
        let book = self
            .client
            .get(self.url(&["books", uid, key])?)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<RemoteBook>>()
            .await?;
        Ok(book)
    }

    async fn set_book(&self, uid: &str, key: &str, book: &RemoteBook) -> Result<(), ShelfError> {
        self.client
            .put(self.url(&["books", uid, key])?)
            .json(book)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_book(&self, uid: &str, key: &str) -> Result<(), ShelfError> {
        self.client
            .delete(self.url(&["books", uid, key])?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_books(&self, uid: &str) -> Result<Vec<RemoteEntry>, ShelfError> {
        let map = self
            .client
            .get(self.url(&["books", uid])?)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<BTreeMap<String, RemoteBook>>>()
            .await?;
        Ok(Self::collect(map))
    }

    async fn books_range(
        &self,
        uid: &str,
        start_at: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, ShelfError> {
        let mut url = self.url(&["books", uid])?;
        {
            // query parameters are JSON values, hence the quoted strings
            let mut query = url.query_pairs_mut();
            query.append_pair("orderBy", "\"$key\"");
            query.append_pair("limitToFirst", &limit.to_string());
            if let Some(start) = start_at {
                query.append_pair("startAt", &serde_json::to_string(start)?);
            }
        }
        // the response is a JSON object, so order is restored by key here
        let map = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<BTreeMap<String, RemoteBook>>>()
            .await?;
        Ok(Self::collect(map))
    }

    async fn watch_books(&self, uid: &str) -> Result<BookSnapshots, ShelfError> {
        let resp = self
            .stream_client
            .get(self.url(&["books", uid])?)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        info!(uid, "subscribed to remote books");

        let this = self.clone();
        let uid = uid.to_string();
        let stream = resp
            .bytes_stream()
            .eventsource()
            .filter_map(move |event| {
                let this = this.clone();
                let uid = uid.clone();
                async move {
                    match event {
                        Ok(ev) if ev.event == "put" || ev.event == "patch" => {
                            Some(this.list_books(&uid).await)
                        }
                        Ok(ev) if ev.event == "cancel" || ev.event == "auth_revoked" => {
                            Some(Err(ShelfError::Remote(format!(
                                "subscription ended by server: {}",
                                ev.event
                            ))))
                        }
                        // keep-alive and unknown events
                        Ok(_) => None,
                        Err(e) => Some(Err(ShelfError::Remote(format!("event stream error: {e}")))),
                    }
                }
            })
            .boxed();
        Ok(stream)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    name: String,
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

/// Object storage client; uploads land under `images/{uuid}`.
#[derive(Clone)]
pub struct RestBlobStore {
    client: reqwest::Client,
    base: Url,
    auth_token: Option<String>,
}

impl RestBlobStore {
    pub fn new(client: reqwest::Client, base: Url, auth_token: Option<String>) -> Self {
        Self {
            client,
            base,
            auth_token,
        }
    }

    /// Public download reference for the stored object `name`.
    pub fn download_url(&self, name: &str, token: Option<&str>) -> Result<Url, ShelfError> {
        let mut url = append_segments(&self.base, &["o", name], "")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("alt", "media");
            if let Some(token) = token {
                query.append_pair("token", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, ShelfError> {
        let name = format!("images/{}", uuid::Uuid::new_v4());
        let mut url = append_segments(&self.base, &["o"], "")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &name);

        let mut req = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = self.auth_token.as_deref() {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ShelfError::Upload(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ShelfError::Upload(format!(
                "storage answered {}",
                resp.status()
            )));
        }
        let uploaded: UploadResponse = resp
            .json()
            .await
            .map_err(|e| ShelfError::Upload(e.to_string()))?;
        let url = self.download_url(&uploaded.name, uploaded.download_tokens.as_deref())?;
        info!(object = %uploaded.name, "cover image uploaded");
        Ok(url.to_string())
    }
}
