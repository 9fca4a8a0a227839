use crate::db::models::{DbUser, DbUserBook, NewUser};
use crate::db::schema::SQLITE_INIT;
use crate::error::ShelfError;
use crate::types::RemoteBook;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

const USER_COLUMNS: &str = "id, first_name, last_name, gender, email, password, \
                            phone_number, balance, remote_id";
const BOOK_COLUMNS: &str =
    "id, user_id, remote_key, book_name, author, category, genre, cover_uri, status";

/// On-device relational store: accounts with balances and shelf entries.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, ShelfError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            // concurrent writers wait for the lock instead of failing
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        debug!(database_url, "local store ready");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ShelfError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn user_exists(&self, email: &str) -> Result<bool, ShelfError> {
        let rec: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec.is_some())
    }

    /// Insert a new account. Returns the row id.
    pub async fn insert_user(&self, user: NewUser) -> Result<i64, ShelfError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                first_name, last_name, gender, email, password, phone_number, balance
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.gender)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.phone_number)
        .bind(user.balance)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_remote_id(&self, id: i64, remote_id: &str) -> Result<(), ShelfError> {
        sqlx::query("UPDATE users SET remote_id = ? WHERE id = ?")
            .bind(remote_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, ShelfError> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<DbUser, ShelfError> {
        sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ShelfError::NotFound(format!("user {id}")))
    }

    pub async fn balance(&self, user_id: i64) -> Result<f64, ShelfError> {
        let rec: Option<(f64,)> = sqlx::query_as("SELECT balance FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        rec.map(|r| r.0)
            .ok_or_else(|| ShelfError::NotFound(format!("user {user_id}")))
    }

    /// Add `amount` in a single statement. Returns the new balance.
    pub async fn credit_balance(&self, user_id: i64, amount: f64) -> Result<f64, ShelfError> {
        let rec: Option<(f64,)> =
            sqlx::query_as("UPDATE users SET balance = balance + ?1 WHERE id = ?2 RETURNING balance")
                .bind(amount)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        rec.map(|r| r.0)
            .ok_or_else(|| ShelfError::NotFound(format!("user {user_id}")))
    }

    /// Subtract `amount` only if the balance covers it, checked and written in
    /// one statement. `None` when the funds are insufficient.
    pub async fn debit_balance(&self, user_id: i64, amount: f64) -> Result<Option<f64>, ShelfError> {
        let rec: Option<(f64,)> = sqlx::query_as(
            "UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1 RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        match rec {
            Some((balance,)) => Ok(Some(balance)),
            // tell a missing user apart from a short balance
            None => self.balance(user_id).await.map(|_| None),
        }
    }

    /// Insert a shelf entry. Returns the row id.
    pub async fn insert_book(
        &self,
        user_id: i64,
        remote_key: Option<&str>,
        book: &RemoteBook,
    ) -> Result<i64, ShelfError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_books (
                user_id, remote_key, book_name, author, category, genre, cover_uri, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(remote_key)
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.genre)
        .bind(&book.cover_uri)
        .bind(&book.status)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Upsert by unique remote_key. Returns the row id.
    /// Uses SQLite `INSERT ... ON CONFLICT(remote_key) DO UPDATE`.
    pub async fn upsert_book(
        &self,
        user_id: i64,
        remote_key: &str,
        book: &RemoteBook,
    ) -> Result<i64, ShelfError> {
        sqlx::query(
            r#"
            INSERT INTO user_books (
                user_id, remote_key, book_name, author, category, genre, cover_uri, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(remote_key) DO UPDATE SET
                book_name=excluded.book_name,
                author=excluded.author,
                category=excluded.category,
                genre=excluded.genre,
                cover_uri=excluded.cover_uri,
                status=excluded.status
            "#,
        )
        .bind(user_id)
        .bind(remote_key)
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.genre)
        .bind(&book.cover_uri)
        .bind(&book.status)
        .execute(&self.pool)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM user_books WHERE remote_key = ?")
            .bind(remote_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn list_books(&self, user_id: i64) -> Result<Vec<DbUserBook>, ShelfError> {
        let rows = sqlx::query_as::<_, DbUserBook>(&format!(
            "SELECT {BOOK_COLUMNS} FROM user_books WHERE user_id = ? ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_book_by_key(
        &self,
        user_id: i64,
        remote_key: &str,
    ) -> Result<Option<DbUserBook>, ShelfError> {
        let row = sqlx::query_as::<_, DbUserBook>(&format!(
            "SELECT {BOOK_COLUMNS} FROM user_books WHERE user_id = ? AND remote_key = ?"
        ))
        .bind(user_id)
        .bind(remote_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete by remote key. Returns the number of rows removed.
    pub async fn delete_book_by_key(
        &self,
        user_id: i64,
        remote_key: &str,
    ) -> Result<u64, ShelfError> {
        let result = sqlx::query("DELETE FROM user_books WHERE user_id = ? AND remote_key = ?")
            .bind(user_id)
            .bind(remote_key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
