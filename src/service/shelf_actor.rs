use crate::error::ShelfError;
use crate::remote::SharedRemote;
use crate::service::merge::merge_by_key;
use crate::session::Session;
use crate::types::{BookEntry, RemoteEntry};

use futures::StreamExt;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Messages handled by the shelf actor.
#[derive(Debug)]
pub enum ShelfMessage {
    /// Rows read from the local store; replaces the local view.
    LocalLoaded(Vec<BookEntry>),
    /// Full remote list, from a fetch or the change listener.
    RemoteSnapshot(Vec<RemoteEntry>),
    /// A book written by this process; applied without waiting for the listener.
    Upserted(BookEntry),
    /// A book deleted by this process, by remote key.
    Removed(String),
    /// Current merged list.
    Snapshot(RpcReplyPort<Vec<BookEntry>>),
    /// Current merged list filtered by a search query.
    Search(String, RpcReplyPort<Vec<BookEntry>>),
}

/// Handle for interacting with one user's shelf actor.
#[derive(Clone)]
pub struct ShelfHandle {
    actor: ActorRef<ShelfMessage>,
    user_id: i64,
}

impl ShelfHandle {
    pub async fn spawn(user_id: i64) -> Result<Self, ShelfError> {
        let (actor, _jh) = Actor::spawn(None, ShelfActor, user_id)
            .await
            .map_err(|e| ShelfError::RactorError(format!("spawn ShelfActor failed: {e}")))?;
        Ok(Self { actor, user_id })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn load_local(&self, books: Vec<BookEntry>) -> Result<(), ShelfError> {
        self.cast(ShelfMessage::LocalLoaded(books))
    }

    pub fn apply_remote(&self, entries: Vec<RemoteEntry>) -> Result<(), ShelfError> {
        self.cast(ShelfMessage::RemoteSnapshot(entries))
    }

    pub fn upserted(&self, entry: BookEntry) -> Result<(), ShelfError> {
        self.cast(ShelfMessage::Upserted(entry))
    }

    pub fn removed(&self, key: impl Into<String>) -> Result<(), ShelfError> {
        self.cast(ShelfMessage::Removed(key.into()))
    }

    pub async fn snapshot(&self) -> Result<Vec<BookEntry>, ShelfError> {
        ractor::call!(self.actor, ShelfMessage::Snapshot)
            .map_err(|e| ShelfError::RactorError(format!("Snapshot RPC failed: {e}")))
    }

    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<BookEntry>, ShelfError> {
        ractor::call!(self.actor, ShelfMessage::Search, query.into())
            .map_err(|e| ShelfError::RactorError(format!("Search RPC failed: {e}")))
    }

    pub fn stop(&self) {
        self.actor.stop(Some("shelf closed".to_string()));
    }

    fn cast(&self, message: ShelfMessage) -> Result<(), ShelfError> {
        self.actor
            .cast(message)
            .map_err(|e| ShelfError::RactorError(format!("shelf actor unreachable: {e}")))
    }
}

/// Internal state held by the shelf actor
struct ShelfState {
    user_id: i64,
    local: Vec<BookEntry>,
    remote: Option<Vec<RemoteEntry>>,
    books: Vec<BookEntry>,
}

impl ShelfState {
    fn recompute(&mut self) {
        self.books = match &self.remote {
            Some(remote) => merge_by_key(self.user_id, &self.local, remote.clone()),
            None => self.local.clone(),
        };
    }

    fn apply_upsert(&mut self, entry: BookEntry) {
        let same = |e: &BookEntry| match (&e.remote_key, &entry.remote_key) {
            (Some(a), Some(b)) => a == b,
            _ => e.local_id.is_some() && e.local_id == entry.local_id,
        };
        match self.local.iter_mut().find(|e| same(&**e)) {
            Some(existing) => *existing = entry.clone(),
            None => self.local.push(entry.clone()),
        }

        if let (Some(remote), Some(key)) = (self.remote.as_mut(), entry.remote_key.as_ref()) {
            let record = entry.to_remote();
            match remote.iter_mut().find(|e| &e.key == key) {
                Some(existing) => existing.book = record,
                None => {
                    remote.push(RemoteEntry::new(key.clone(), record));
                    remote.sort_by(|a, b| a.key.cmp(&b.key));
                }
            }
        }
    }

    fn apply_remove(&mut self, key: &str) {
        self.local
            .retain(|e| e.remote_key.as_deref() != Some(key));
        if let Some(remote) = self.remote.as_mut() {
            remote.retain(|e| e.key != key);
        }
    }
}

/// ractor-based shelf actor; owns the in-memory list shown to the user.
struct ShelfActor;

#[ractor::async_trait]
impl Actor for ShelfActor {
    type Msg = ShelfMessage;
    type State = ShelfState;
    type Arguments = i64;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        user_id: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!(user_id, "ShelfActor started");
        Ok(ShelfState {
            user_id,
            local: Vec::new(),
            remote: None,
            books: Vec::new(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ShelfMessage::LocalLoaded(books) => {
                debug!(user_id = state.user_id, count = books.len(), "local shelf loaded");
                state.local = books;
                state.recompute();
            }
            ShelfMessage::RemoteSnapshot(entries) => {
                debug!(user_id = state.user_id, count = entries.len(), "remote snapshot received");
                state.remote = Some(entries);
                state.recompute();
            }
            ShelfMessage::Upserted(entry) => {
                state.apply_upsert(entry);
                state.recompute();
            }
            ShelfMessage::Removed(key) => {
                state.apply_remove(&key);
                state.recompute();
            }
            ShelfMessage::Snapshot(reply) => {
                let _ = reply.send(state.books.clone());
            }
            ShelfMessage::Search(query, reply) => {
                let hits = state
                    .books
                    .iter()
                    .filter(|b| b.matches(&query))
                    .cloned()
                    .collect();
                let _ = reply.send(hits);
            }
        }
        Ok(())
    }
}

/// Forward remote change snapshots into the shelf actor until either side goes away.
pub fn spawn_listener(handle: ShelfHandle, remote: SharedRemote, uid: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut snapshots = match remote.watch_books(&uid).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(uid = %uid, error = %e, "remote listener could not subscribe");
                return;
            }
        };
        while let Some(item) = snapshots.next().await {
            match item {
                Ok(entries) => {
                    if handle.apply_remote(entries).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(uid = %uid, error = %e, "remote listener error"),
            }
        }
        info!(uid = %uid, "remote listener stopped");
    })
}

struct ActiveShelf {
    handle: ShelfHandle,
    listener: JoinHandle<()>,
}

impl ActiveShelf {
    fn close(self) {
        self.listener.abort();
        self.handle.stop();
    }
}

/// The shelf of the signed-in user, if one is open.
#[derive(Clone, Default)]
pub struct ShelfSlot {
    inner: Arc<Mutex<Option<ActiveShelf>>>,
}

impl ShelfSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The open shelf for `session`, opening one (actor plus remote listener)
    /// if needed. The flag is `true` when the shelf was just opened and has
    /// not been loaded yet.
    pub async fn open(
        &self,
        session: &Session,
        remote: &SharedRemote,
    ) -> Result<(ShelfHandle, bool), ShelfError> {
        let mut slot = self.inner.lock().await;
        if let Some(active) = slot.as_ref()
            && active.handle.user_id() == session.user_id
        {
            return Ok((active.handle.clone(), false));
        }
        if let Some(previous) = slot.take() {
            previous.close();
        }

        let handle = ShelfHandle::spawn(session.user_id).await?;
        let listener = spawn_listener(handle.clone(), remote.clone(), session.remote_uid.clone());
        *slot = Some(ActiveShelf {
            handle: handle.clone(),
            listener,
        });
        info!(user_id = session.user_id, "shelf opened");
        Ok((handle, true))
    }

    pub async fn current(&self) -> Option<ShelfHandle> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|active| active.handle.clone())
    }

    /// Stop the listener and the actor; in-flight remote results are dropped.
    pub async fn close(&self) {
        if let Some(active) = self.inner.lock().await.take() {
            info!(user_id = active.handle.user_id(), "shelf closed");
            active.close();
        }
    }
}
