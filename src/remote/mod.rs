//! Remote document store and blob store seams.
//!
//! Layout mirrors the hosted realtime database:
//! - `/users/{userId}` → profile and balance
//! - `/books/{userId}/{pushId}` → book record
//! - `/images/{randomId}` → uploaded cover (blob store)

pub mod memory;
pub mod page;
pub mod push_id;
pub mod rest;

use crate::config::{RemoteBackend, RemoteConfig};
use crate::error::ShelfError;
use crate::types::{RemoteBook, RemoteEntry, RemoteUser};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

pub use memory::{MemoryBlobStore, MemoryRemote, RemoteOp};
pub use page::{fetch_page, window};
pub use rest::{RestBlobStore, RestRemote};

/// Full snapshots of one user's books, one item per change.
pub type BookSnapshots = BoxStream<'static, Result<Vec<RemoteEntry>, ShelfError>>;

/// Hierarchical key-value store holding mirrored users and books.
///
/// Every call is issued once; implementations do not retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn save_user(&self, uid: &str, user: &RemoteUser) -> Result<(), ShelfError>;

    async fn update_balance(&self, uid: &str, balance: f64) -> Result<(), ShelfError>;

    async fn get_balance(&self, uid: &str) -> Result<Option<f64>, ShelfError>;

    /// Create a record under a fresh push key and return the key.
    async fn push_book(&self, uid: &str, book: &RemoteBook) -> Result<String, ShelfError>;

    async fn get_book(&self, uid: &str, key: &str) -> Result<Option<RemoteBook>, ShelfError>;

    /// Replace the record at `key`.
    async fn set_book(&self, uid: &str, key: &str, book: &RemoteBook) -> Result<(), ShelfError>;

    async fn delete_book(&self, uid: &str, key: &str) -> Result<(), ShelfError>;

    /// All books of `uid`, ordered by key.
    async fn list_books(&self, uid: &str) -> Result<Vec<RemoteEntry>, ShelfError>;

    /// Up to `limit` books ordered by key, starting at `start_at` inclusive.
    async fn books_range(
        &self,
        uid: &str,
        start_at: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, ShelfError>;

    /// Subscribe to `uid`'s books. The first item is the current snapshot.
    async fn watch_books(&self, uid: &str) -> Result<BookSnapshots, ShelfError>;
}

/// Object storage for cover images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the image under `images/{randomId}` and return its download reference.
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, ShelfError>;
}

pub type SharedRemote = Arc<dyn RemoteStore>;
pub type SharedBlobs = Arc<dyn BlobStore>;

/// Build the configured remote backends.
pub fn build(cfg: &RemoteConfig) -> Result<(SharedRemote, SharedBlobs), ShelfError> {
    match cfg.backend {
        RemoteBackend::Memory => Ok((
            Arc::new(MemoryRemote::new()),
            Arc::new(MemoryBlobStore::new()),
        )),
        RemoteBackend::Rest => {
            let database_url = cfg.database_url.clone().ok_or_else(|| {
                ShelfError::Misconfigured("remote.database_url is required for rest".to_string())
            })?;
            let storage_url = cfg.storage_url.clone().ok_or_else(|| {
                ShelfError::Misconfigured("remote.storage_url is required for rest".to_string())
            })?;
            let client = rest::build_client(cfg.request_timeout_secs)?;
            Ok((
                Arc::new(RestRemote::new(
                    client.clone(),
                    database_url,
                    cfg.auth_token.clone(),
                )),
                Arc::new(RestBlobStore::new(
                    client,
                    storage_url,
                    cfg.auth_token.clone(),
                )),
            ))
        }
    }
}
