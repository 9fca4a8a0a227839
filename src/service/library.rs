//! Bookshelf writes across the local and remote stores.
//!
//! Policy: the remote store owns book identity (push keys), so every write
//! goes remote first and the local row follows. Adding a book is the only
//! path with compensation: if the local insert fails, the remote record is
//! deleted again. Later partial failures are reported, not repaired.

use crate::db::LocalStore;
use crate::error::ShelfError;
use crate::remote::{SharedBlobs, SharedRemote, fetch_page};
use crate::service::merge::merge_by_key;
use crate::session::Session;
use crate::types::{BookDraft, BookEntry, BookPage, CoverImage, ReadingStatus, RemoteBook, RemoteEntry};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct LibraryService {
    local: LocalStore,
    remote: SharedRemote,
    blobs: SharedBlobs,
}

impl LibraryService {
    pub fn new(local: LocalStore, remote: SharedRemote, blobs: SharedBlobs) -> Self {
        Self {
            local,
            remote,
            blobs,
        }
    }

    pub fn remote(&self) -> &SharedRemote {
        &self.remote
    }

    /// Upload (optional) → remote push → local insert, rolling the remote
    /// record back if the local insert fails.
    pub async fn add_book(
        &self,
        session: &Session,
        draft: BookDraft,
        cover: Option<CoverImage>,
    ) -> Result<BookEntry, ShelfError> {
        draft.validate().into_result()?;

        let cover_uri = match cover {
            Some(image) => Some(self.upload(image).await?),
            None => None,
        };

        let record = draft.into_remote(cover_uri);
        let key = self.remote.push_book(&session.remote_uid, &record).await?;
        debug!(user_id = session.user_id, key = %key, "remote book created");

        let inserted = self
            .local
            .insert_book(session.user_id, Some(&key), &record)
            .await;
        match inserted {
            Ok(local_id) => {
                info!(user_id = session.user_id, key = %key, local_id, "book added");
                let mut entry = BookEntry::from_remote(session.user_id, RemoteEntry::new(key, record));
                entry.local_id = Some(local_id);
                Ok(entry)
            }
            Err(cause) => Err(self.roll_back_push(session, key, cause).await),
        }
    }

    async fn roll_back_push(&self, session: &Session, key: String, cause: ShelfError) -> ShelfError {
        warn!(user_id = session.user_id, key = %key, error = %cause, "local insert failed; removing remote book");
        match self.remote.delete_book(&session.remote_uid, &key).await {
            Ok(()) => ShelfError::RolledBack {
                key,
                cause: cause.to_string(),
            },
            Err(rollback) => {
                error!(user_id = session.user_id, key = %key, error = %rollback, "remote rollback failed");
                ShelfError::RollbackFailed {
                    key,
                    cause: cause.to_string(),
                    rollback: rollback.to_string(),
                }
            }
        }
    }

    async fn upload(&self, image: CoverImage) -> Result<String, ShelfError> {
        let uri = self
            .blobs
            .upload_image(image.bytes, &image.content_type)
            .await
            .map_err(|e| match e {
                ShelfError::Upload(_) => e,
                other => ShelfError::Upload(other.to_string()),
            })?;
        debug!(uri = %uri, "cover uploaded");
        Ok(uri)
    }

    pub async fn update_status(
        &self,
        session: &Session,
        key: &str,
        status: Option<ReadingStatus>,
    ) -> Result<BookEntry, ShelfError> {
        self.rewrite(session, key, |book| {
            book.status = status.map(|s| s.label().to_string());
        })
        .await
    }

    /// Upload the new cover, then rewrite the record with its reference.
    pub async fn update_cover(
        &self,
        session: &Session,
        key: &str,
        cover: CoverImage,
    ) -> Result<BookEntry, ShelfError> {
        // fail before uploading anything for a key that does not exist
        self.current_record(session, key).await?;
        let uri = self.upload(cover).await?;
        self.rewrite(session, key, move |book| book.cover_uri = Some(uri))
            .await
    }

    async fn current_record(&self, session: &Session, key: &str) -> Result<RemoteBook, ShelfError> {
        self.remote
            .get_book(&session.remote_uid, key)
            .await?
            .ok_or_else(|| ShelfError::NotFound(format!("book {key}")))
    }

    /// Remote set, then local upsert of the changed record.
    async fn rewrite(
        &self,
        session: &Session,
        key: &str,
        edit: impl FnOnce(&mut RemoteBook),
    ) -> Result<BookEntry, ShelfError> {
        let mut record = self.current_record(session, key).await?;
        edit(&mut record);

        self.remote
            .set_book(&session.remote_uid, key, &record)
            .await?;

        let local_id = self
            .local
            .upsert_book(session.user_id, key, &record)
            .await
            .map_err(|e| {
                warn!(user_id = session.user_id, key, error = %e, "local mirror of book update failed");
                ShelfError::PartialFailure(format!("book {key}: {e}"))
            })?;

        info!(user_id = session.user_id, key, local_id, "book updated");
        let mut entry = BookEntry::from_remote(session.user_id, RemoteEntry::new(key, record));
        entry.local_id = Some(local_id);
        Ok(entry)
    }

    /// Remote delete, then local delete. A local failure is not compensated.
    pub async fn delete_book(&self, session: &Session, key: &str) -> Result<(), ShelfError> {
        self.remote
            .delete_book(&session.remote_uid, key)
            .await?;

        let removed = self
            .local
            .delete_book_by_key(session.user_id, key)
            .await
            .map_err(|e| {
                warn!(user_id = session.user_id, key, error = %e, "book deleted remotely but not locally");
                ShelfError::PartialFailure(format!("book {key}: {e}"))
            })?;

        info!(user_id = session.user_id, key, local_rows = removed, "book deleted");
        Ok(())
    }

    /// Local rows only, for immediate display.
    pub async fn local_shelf(&self, session: &Session) -> Result<Vec<BookEntry>, ShelfError> {
        let rows = self.local.list_books(session.user_id).await?;
        Ok(rows.into_iter().map(BookEntry::from).collect())
    }

    pub async fn remote_books(&self, session: &Session) -> Result<Vec<RemoteEntry>, ShelfError> {
        self.remote.list_books(&session.remote_uid).await
    }

    /// Local rows merged with the remote list. Without the remote list the
    /// local rows are returned as they are.
    pub async fn load_shelf(&self, session: &Session) -> Result<Vec<BookEntry>, ShelfError> {
        let local = self.local_shelf(session).await?;
        match self.remote_books(session).await {
            Ok(remote) => Ok(merge_by_key(session.user_id, &local, remote)),
            Err(e) => {
                warn!(user_id = session.user_id, error = %e, "remote shelf unavailable; showing local rows");
                Ok(local)
            }
        }
    }

    pub async fn page(
        &self,
        session: &Session,
        page_size: usize,
        start_after: Option<&str>,
    ) -> Result<BookPage, ShelfError> {
        fetch_page(self.remote.as_ref(), &session.remote_uid, page_size, start_after).await
    }
}
