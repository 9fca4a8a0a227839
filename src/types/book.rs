use serde::{Deserialize, Serialize};

use super::catalog::{ReadingStatus, is_valid_genre};
use crate::error::FieldErrors;

/// Book record as stored under `/books/{userId}/{pushId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub cover_uri: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A remote book together with its push key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub key: String,
    pub book: RemoteBook,
}

impl RemoteEntry {
    pub fn new(key: impl Into<String>, book: RemoteBook) -> Self {
        Self {
            key: key.into(),
            book,
        }
    }
}

/// Book entry as presented on the shelf, joined across both stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    /// Row id in the local store; store-local and never sent remotely.
    pub local_id: Option<i64>,
    /// Push key in the remote store; the join key between the two stores.
    pub remote_key: Option<String>,
    pub user_id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub genre: String,
    pub cover_uri: Option<String>,
    pub status: Option<ReadingStatus>,
}

impl BookEntry {
    pub fn to_remote(&self) -> RemoteBook {
        RemoteBook {
            name: self.title.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            genre: self.genre.clone(),
            cover_uri: self.cover_uri.clone(),
            status: self.status.map(|s| s.label().to_string()),
        }
    }

    /// Entry built from a remote record; there is no local row yet.
    pub fn from_remote(user_id: i64, entry: RemoteEntry) -> Self {
        let RemoteEntry { key, book } = entry;
        Self {
            local_id: None,
            remote_key: Some(key),
            user_id,
            title: book.name,
            author: book.author,
            category: book.category,
            genre: book.genre,
            cover_uri: book.cover_uri,
            status: book.status.as_deref().and_then(|s| s.parse().ok()),
        }
    }

    /// Case-insensitive substring match over title, author, category and genre.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.author, &self.category, &self.genre]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Input for a new book, before either store has seen it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub category: String,
    pub genre: String,
    #[serde(default)]
    pub status: Option<ReadingStatus>,
}

impl BookDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "Title is required");
        }
        if self.author.trim().is_empty() {
            errors.add("author", "Author is required");
        }
        if self.category.trim().is_empty() {
            errors.add("category", "Please select a category");
        } else if super::catalog::genres_for(&self.category).is_none() {
            errors.add("category", "Unknown category");
        }
        if self.genre.trim().is_empty() {
            errors.add("genre", "Please select a genre");
        } else if errors.get("category").is_none() && !is_valid_genre(&self.category, &self.genre)
        {
            errors.add("genre", "Genre does not belong to the selected category");
        }
        errors
    }

    pub fn into_remote(self, cover_uri: Option<String>) -> RemoteBook {
        RemoteBook {
            name: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            category: self.category,
            genre: self.genre,
            cover_uri,
            status: self.status.map(|s| s.label().to_string()),
        }
    }
}

/// Raw cover image bytes awaiting upload.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// One forward-only page of remote books ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookPage {
    pub books: Vec<RemoteEntry>,
    /// Start key for the following page; `None` once the set is exhausted.
    pub next_key: Option<String>,
}
