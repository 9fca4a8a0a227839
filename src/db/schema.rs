//! SQL DDL for initializing the local store.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `users`: account rows, `email` UNIQUE, `balance` REAL, optional `remote_id`
/// - `user_books`: one row per shelf entry (flat form, no de-duplication across users)
/// - `remote_key` UNIQUE so a remote record maps to at most one local row
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL, -- SHA-256 hex
    phone_number TEXT NOT NULL,
    balance REAL NOT NULL DEFAULT 0,
    remote_id TEXT NULL
);

CREATE TABLE IF NOT EXISTS user_books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    remote_key TEXT NULL UNIQUE,
    book_name TEXT NOT NULL,
    author TEXT NOT NULL,
    category TEXT NOT NULL,
    genre TEXT NOT NULL,
    cover_uri TEXT NULL,
    status TEXT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_user_books_user_id ON user_books(user_id);
"#;
