#![allow(dead_code)]

use shelfbank::db::LocalStore;
use shelfbank::remote::{MemoryBlobStore, MemoryRemote, SharedBlobs, SharedRemote};
use shelfbank::service::{AccountService, LibraryService};
use shelfbank::session::{Session, SessionStore};
use shelfbank::types::{BookDraft, SignupForm};
use shelfbank::ShelfState;
use std::sync::Arc;
use tempfile::TempDir;

/// Both stores, the session file and the services, all in a temp directory.
pub struct Harness {
    pub dir: TempDir,
    pub local: LocalStore,
    pub remote: Arc<MemoryRemote>,
    pub blobs: Arc<MemoryBlobStore>,
    pub sessions: SessionStore,
    pub accounts: AccountService,
    pub library: LibraryService,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let database_url = format!("sqlite:{}", dir.path().join("shelf.sqlite").display());
        let local = LocalStore::connect(&database_url)
            .await
            .expect("failed to open local store");
        let remote = Arc::new(MemoryRemote::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let sessions = SessionStore::new(dir.path().join("session.json"));
        let shared_remote: SharedRemote = remote.clone();
        let shared_blobs: SharedBlobs = blobs.clone();
        let accounts = AccountService::new(local.clone(), shared_remote.clone(), sessions.clone());
        let library = LibraryService::new(local.clone(), shared_remote, shared_blobs);
        Self {
            dir,
            local,
            remote,
            blobs,
            sessions,
            accounts,
            library,
        }
    }

    pub fn state(&self) -> ShelfState {
        ShelfState::new(
            self.local.clone(),
            self.remote.clone(),
            self.blobs.clone(),
            self.sessions.clone(),
            10,
        )
    }

    /// Sign up `email` and log in as that user.
    pub async fn signed_in(&self, email: &str) -> Session {
        self.accounts
            .signup(signup_form(email))
            .await
            .expect("signup failed");
        self.accounts
            .login(email, PASSWORD)
            .await
            .expect("login failed")
    }

    /// Make every local write to `user_books` of the given kind abort.
    pub async fn break_local_books(&self, event: &str) {
        let sql = format!(
            "CREATE TRIGGER fail_books_{} BEFORE {event} ON user_books \
             BEGIN SELECT RAISE(ABORT, 'disk full'); END",
            event.to_lowercase()
        );
        sqlx::query(&sql)
            .execute(self.local.pool())
            .await
            .expect("failed to install trigger");
    }
}

pub const PASSWORD: &str = "correct horse";

pub fn signup_form(email: &str) -> SignupForm {
    SignupForm {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        gender: "Female".to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
        phone_number: "081234567890".to_string(),
    }
}

pub fn draft(title: &str) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        author: "Frank Herbert".to_string(),
        category: "FICTION".to_string(),
        genre: "Science-Fiction".to_string(),
        status: None,
    }
}
