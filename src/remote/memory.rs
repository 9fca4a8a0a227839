//! In-process remote backends used for offline mode and tests.
//!
//! Failures can be injected per operation to exercise partial-failure paths.

use super::push_id::PushIdGenerator;
use super::{BlobStore, BookSnapshots, RemoteStore};
use crate::error::ShelfError;
use crate::types::{RemoteBook, RemoteEntry, RemoteUser};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Operations of the in-memory remote that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    SaveUser,
    UpdateBalance,
    GetBalance,
    PushBook,
    GetBook,
    SetBook,
    DeleteBook,
    ListBooks,
    BooksRange,
    WatchBooks,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, RemoteUser>,
    books: HashMap<String, BTreeMap<String, RemoteBook>>,
    ids: PushIdGenerator,
    failing: HashSet<RemoteOp>,
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<Vec<RemoteEntry>>>>,
}

impl MemoryState {
    fn check(&self, op: RemoteOp) -> Result<(), ShelfError> {
        if self.failing.contains(&op) {
            return Err(ShelfError::Remote(format!("injected failure for {op:?}")));
        }
        Ok(())
    }

    fn snapshot(&self, uid: &str) -> Vec<RemoteEntry> {
        self.books
            .get(uid)
            .map(|books| {
                books
                    .iter()
                    .map(|(key, book)| RemoteEntry::new(key.clone(), book.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&mut self, uid: &str) {
        let snapshot = self.snapshot(uid);
        if let Some(watchers) = self.watchers.get_mut(uid) {
            watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `op` fail until [`MemoryRemote::recover`] is called.
    pub async fn fail_on(&self, op: RemoteOp) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: RemoteOp) {
        self.state.lock().await.failing.remove(&op);
    }

    pub async fn user(&self, uid: &str) -> Option<RemoteUser> {
        self.state.lock().await.users.get(uid).cloned()
    }

    pub async fn book_count(&self, uid: &str) -> usize {
        self.state
            .lock()
            .await
            .books
            .get(uid)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn save_user(&self, uid: &str, user: &RemoteUser) -> Result<(), ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::SaveUser)?;
        state.users.insert(uid.to_string(), user.clone());
        Ok(())
    }

    async fn update_balance(&self, uid: &str, balance: f64) -> Result<(), ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::UpdateBalance)?;
        // writing a child path creates its parents
        let user = state
            .users
            .entry(uid.to_string())
            .or_insert_with(|| RemoteUser {
                full_name: String::new(),
                email: String::new(),
                balance: 0.0,
            });
        user.balance = balance;
        Ok(())
    }

    async fn get_balance(&self, uid: &str) -> Result<Option<f64>, ShelfError> {
        let state = self.state.lock().await;
        state.check(RemoteOp::GetBalance)?;
        Ok(state.users.get(uid).map(|u| u.balance))
    }

    async fn push_book(&self, uid: &str, book: &RemoteBook) -> Result<String, ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::PushBook)?;
        let key = state.ids.next_id();
        state
            .books
            .entry(uid.to_string())
            .or_default()
            .insert(key.clone(), book.clone());
        state.notify(uid);
        debug!(uid, key = %key, "memory remote: pushed book");
        Ok(key)
    }

    async fn get_book(&self, uid: &str, key: &str) -> Result<Option<RemoteBook>, ShelfError> {
        let state = self.state.lock().await;
        state.check(RemoteOp::GetBook)?;
        Ok(state.books.get(uid).and_then(|b| b.get(key)).cloned())
    }

    async fn set_book(&self, uid: &str, key: &str, book: &RemoteBook) -> Result<(), ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::SetBook)?;
        state
            .books
            .entry(uid.to_string())
            .or_default()
            .insert(key.to_string(), book.clone());
        state.notify(uid);
        Ok(())
    }

    async fn delete_book(&self, uid: &str, key: &str) -> Result<(), ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::DeleteBook)?;
        // removing a missing path is not an error
        if let Some(books) = state.books.get_mut(uid) {
            books.remove(key);
        }
        state.notify(uid);
        Ok(())
    }

    async fn list_books(&self, uid: &str) -> Result<Vec<RemoteEntry>, ShelfError> {
        let state = self.state.lock().await;
        state.check(RemoteOp::ListBooks)?;
        Ok(state.snapshot(uid))
    }

    async fn books_range(
        &self,
        uid: &str,
        start_at: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, ShelfError> {
        let state = self.state.lock().await;
        state.check(RemoteOp::BooksRange)?;
        let Some(books) = state.books.get(uid) else {
            return Ok(Vec::new());
        };
        let lower = match start_at {
            Some(key) => Bound::Included(key.to_string()),
            None => Bound::Unbounded,
        };
        Ok(books
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(key, book)| RemoteEntry::new(key.clone(), book.clone()))
            .collect())
    }

    async fn watch_books(&self, uid: &str) -> Result<BookSnapshots, ShelfError> {
        let mut state = self.state.lock().await;
        state.check(RemoteOp::WatchBooks)?;
        let (tx, rx) = mpsc::unbounded_channel();
        // initial snapshot, like a value listener firing on attach
        let _ = tx.send(state.snapshot(uid));
        state.watchers.entry(uid.to_string()).or_default().push(tx);
        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}

/// In-memory blob store handing out `memory://images/{id}` references.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    pub const SCHEME_PREFIX: &'static str = "memory://";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Content type and bytes behind a download reference.
    pub async fn get(&self, reference: &str) -> Option<(String, Vec<u8>)> {
        let path = reference.strip_prefix(Self::SCHEME_PREFIX)?;
        self.objects.lock().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, ShelfError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShelfError::Upload("injected upload failure".to_string()));
        }
        let path = format!("images/{}", uuid::Uuid::new_v4());
        self.objects
            .lock()
            .await
            .insert(path.clone(), (content_type.to_string(), bytes));
        Ok(format!("{}{path}", Self::SCHEME_PREFIX))
    }
}
