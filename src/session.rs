//! Persisted sign-in session.
//!
//! The session is a small JSON document on disk, created on login and removed
//! on logout. It is passed explicitly; nothing reads it from ambient state.

use crate::error::ShelfError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    /// Row id in the local store.
    #[serde(rename = "id")]
    pub user_id: i64,
    /// Subtree id in the remote store.
    #[serde(rename = "remoteId")]
    pub remote_uid: String,
    #[serde(rename = "isLogin")]
    pub logged_in: bool,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, if any.
    pub async fn load(&self) -> Result<Option<Session>, ShelfError> {
        match fs::read(&self.path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), ShelfError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        // replace atomically
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        fs::rename(&tmp, &self.path).await?;
        info!(user_id = session.user_id, "session saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ShelfError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_logged_in(&self) -> Result<bool, ShelfError> {
        Ok(self.load().await?.is_some_and(|s| s.logged_in))
    }

    /// The signed-in session, or `NotAuthenticated`.
    /// The signed-in session. A missing, logged-out or unreadable session
    /// file all mean `NotAuthenticated`; the next login overwrites it.
    pub async fn require(&self) -> Result<Session, ShelfError> {
        match self.load().await {
            Ok(Some(session)) if session.logged_in => Ok(session),
            Ok(_) => {
                debug!("no signed-in session");
                Err(ShelfError::NotAuthenticated)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable");
                Err(ShelfError::NotAuthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            user_id: 7,
            remote_uid: "local-7".to_string(),
            logged_in: true,
        }
    }

    #[tokio::test]
    async fn save_load_clear_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().await.expect("load"), None);
        assert!(matches!(
            store.require().await,
            Err(ShelfError::NotAuthenticated)
        ));

        store.save(&sample()).await.expect("save");
        assert_eq!(store.require().await.expect("require"), sample());

        store.clear().await.expect("clear");
        assert!(!store.is_logged_in().await.expect("is_logged_in"));
        store.clear().await.expect("clearing twice is fine");
    }

    #[tokio::test]
    async fn logged_out_flag_fails_the_guard() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut session = sample();
        session.logged_in = false;
        store.save(&session).await.expect("save");
        assert!(matches!(
            store.require().await,
            Err(ShelfError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn corrupt_file_fails_the_guard_until_next_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("session.json"));
        fs::write(store.path(), b"{not json").await.expect("write");

        assert!(store.load().await.is_err());
        assert!(matches!(
            store.require().await,
            Err(ShelfError::NotAuthenticated)
        ));

        store.save(&sample()).await.expect("save");
        assert_eq!(store.require().await.expect("require"), sample());
    }
}
