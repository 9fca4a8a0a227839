use crate::types::BookEntry;
use crate::types::catalog::parse_stored_status;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub balance: f64,
    pub remote_id: Option<String>,
}

impl DbUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Identifier of this user's subtree in the remote store.
    pub fn remote_uid(&self) -> String {
        self.remote_id
            .clone()
            .unwrap_or_else(|| format!("local-{}", self.id))
    }
}

/// Fields for a new `users` row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUserBook {
    pub id: i64,
    pub user_id: i64,
    pub remote_key: Option<String>,
    pub book_name: String,
    pub author: String,
    pub category: String,
    pub genre: String,
    pub cover_uri: Option<String>,
    pub status: Option<String>,
}

impl From<DbUserBook> for BookEntry {
    fn from(d: DbUserBook) -> Self {
        let status = parse_stored_status(d.status.as_deref());
        Self {
            local_id: Some(d.id),
            remote_key: d.remote_key,
            user_id: d.user_id,
            title: d.book_name,
            author: d.author,
            category: d.category,
            genre: d.genre,
            cover_uri: d.cover_uri,
            status,
        }
    }
}
