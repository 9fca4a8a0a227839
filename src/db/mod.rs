//! Database module: models and schema for the local store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `LocalStore`, the query layer over a sqlx pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbUser, DbUserBook, NewUser};
pub use schema::SQLITE_INIT;
pub use sqlite::{LocalStore, SqlitePool};
