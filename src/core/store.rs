//! Book storage.
//!
//! The resolver only needs two operations: look up an identifier and
//! insert a new record. [`SqliteStore`] implements them on a single SQLite
//! connection guarded by a mutex, so inserts are serialized. Every
//! operation runs on the blocking pool under a fixed timeout.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::core::dates;
use crate::domain::{BookRecord, ExistingBook, Isbn, Source, StoredBook};

/// Default per-operation timeout (3 minutes)
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(180);

/// Largest timeout SQLite's busy handler accepts (`i32::MAX` milliseconds)
pub const MAX_STORE_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS books (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    title          TEXT NOT NULL,
    subtitle       TEXT NOT NULL DEFAULT '',
    published_date TEXT,
    description    TEXT NOT NULL DEFAULT '',
    publisher      TEXT NOT NULL DEFAULT '',
    thumbnail      TEXT NOT NULL DEFAULT '',
    self_link      TEXT NOT NULL DEFAULT '',
    categories     TEXT NOT NULL DEFAULT '',
    authors        TEXT NOT NULL DEFAULT '',
    isbn10         TEXT NOT NULL DEFAULT '',
    isbn13         TEXT NOT NULL DEFAULT '',
    source         TEXT NOT NULL,
    in_library     INTEGER NOT NULL DEFAULT 0,
    notes          TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS books_isbn10 ON books (isbn10);
CREATE INDEX IF NOT EXISTS books_isbn13 ON books (isbn13);
";

/// Errors that can occur in the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Persistence used by the resolver
#[async_trait]
pub trait Store: Send + Sync {
    /// Find stored books whose ISBN-10 or ISBN-13 equals `isbn`
    async fn lookup(&self, isbn: &Isbn) -> Result<Option<ExistingBook>, StoreError>;

    /// Insert a new row (never an upsert) and return its id.
    ///
    /// A write still waiting for the connection when its timeout fires is
    /// dropped without touching the table. One whose INSERT has already
    /// started cannot be recalled and may commit after `Timeout` is
    /// returned.
    async fn write(&self, record: &BookRecord) -> Result<i64, StoreError>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the `books` table exists
    pub fn open(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened book database");
        Self::init(conn, timeout)
    }

    /// Open a private in-memory database
    pub fn open_in_memory(timeout: Duration) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, timeout)
    }

    fn init(conn: Connection, timeout: Duration) -> Result<Self, StoreError> {
        // rusqlite panics on busy timeouts past i32::MAX ms
        conn.busy_timeout(timeout.min(MAX_STORE_TIMEOUT))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Most recently added books, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredBook>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn("recent", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, authors, isbn10, isbn13, published_date, source, created_at
                 FROM books ORDER BY id DESC LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit], |row| {
                let published: Option<String> = row.get(5)?;
                let source: String = row.get(6)?;
                let created: String = row.get(7)?;

                Ok(StoredBook {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    authors: row.get(2)?,
                    isbn10: row.get(3)?,
                    isbn13: row.get(4)?,
                    published_date: published.as_deref().and_then(dates::parse),
                    source: Source::from_tag(&source),
                    created_at: parse_timestamp(7, &created)?,
                })
            })?;

            let books = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(books)
        })
        .await
    }

    /// Run `f` on the connection in the blocking pool, bounded by the timeout.
    ///
    /// The blocking task outlives a timed-out caller, so it re-checks the
    /// deadline once it holds the connection and gives up without running
    /// `f` if the caller has already been told it timed out.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let timeout = self.timeout;
        let deadline = Instant::now().checked_add(timeout);

        let task = tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(operation, "Dropping store operation past its deadline");
                return Err(StoreError::Timeout { operation, timeout });
            }
            f(&*guard).map_err(StoreError::from)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(StoreError::Timeout { operation, timeout }),
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn lookup(&self, isbn: &Isbn) -> Result<Option<ExistingBook>, StoreError> {
        let isbn = isbn.as_str().to_string();

        self.with_conn("lookup", move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM books WHERE isbn10 = ?1 OR isbn13 = ?1",
                params![isbn],
                |row| row.get(0),
            )?;

            if count == 0 {
                return Ok(None);
            }

            let title: Option<String> = conn
                .query_row(
                    "SELECT title FROM books WHERE isbn10 = ?1 OR isbn13 = ?1
                     ORDER BY id LIMIT 1",
                    params![isbn],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(Some(ExistingBook {
                count,
                title: title.unwrap_or_default(),
            }))
        })
        .await
    }

    async fn write(&self, record: &BookRecord) -> Result<i64, StoreError> {
        let record = record.clone();

        self.with_conn("write", move |conn| {
            conn.execute(
                "INSERT INTO books (title, subtitle, published_date, description, publisher,
                    thumbnail, self_link, categories, authors, isbn10, isbn13, source,
                    in_library, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.title,
                    record.subtitle,
                    record.published_date.map(dates::format),
                    record.description,
                    record.publisher,
                    record.thumbnail,
                    record.self_link,
                    record.categories,
                    record.authors,
                    record.isbn10,
                    record.isbn13,
                    record.source.as_str(),
                    false,
                    "",
                    Utc::now().to_rfc3339(),
                ],
            )?;

            Ok(conn.last_insert_rowid())
        })
        .await
    }
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(DEFAULT_STORE_TIMEOUT).unwrap()
    }

    fn record(title: &str, isbn10: &str, isbn13: &str) -> BookRecord {
        let mut record = BookRecord::new(title, Source::Google).unwrap();
        record.isbn10 = isbn10.to_string();
        record.isbn13 = isbn13.to_string();
        record.published_date = NaiveDate::from_ymd_opt(1955, 1, 1);
        record
    }

    #[tokio::test]
    async fn test_lookup_empty_store() {
        let store = store();
        let isbn = Isbn::parse("9780140449136").unwrap();
        assert_eq!(store.lookup(&isbn).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_matches_either_isbn() {
        let store = store();
        store
            .write(&record("The Republic", "0140449132", "9780140449136"))
            .await
            .unwrap();

        let by13 = store.lookup(&Isbn::parse("9780140449136").unwrap()).await.unwrap();
        let by10 = store.lookup(&Isbn::parse("0140449132").unwrap()).await.unwrap();

        assert_eq!(by13.as_ref().map(|b| b.title.as_str()), Some("The Republic"));
        assert_eq!(by10.map(|b| b.count), Some(1));
    }

    #[tokio::test]
    async fn test_write_always_inserts() {
        let store = store();
        let book = record("The Republic", "", "9780140449136");

        let first = store.write(&book).await.unwrap();
        let second = store.write(&book).await.unwrap();
        assert_eq!(second, first + 1);

        let existing = store
            .lookup(&Isbn::parse("9780140449136").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.count, 2);
    }

    #[test]
    fn test_huge_timeout_does_not_panic() {
        let store = SqliteStore::open_in_memory(Duration::from_secs(3_000_000)).unwrap();
        assert_eq!(store.timeout, Duration::from_secs(3_000_000));
    }

    #[tokio::test]
    async fn test_timeout_aborts_only_that_operation() {
        let store = SqliteStore::open_in_memory(Duration::from_millis(200)).unwrap();
        let isbn = Isbn::parse("9780140449136").unwrap();
        let book = record("The Republic", "0140449132", "9780140449136");

        // Another holder keeps the connection busy past the timeout
        let guard = store.conn.lock().unwrap();

        let err = store.lookup(&isbn).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout {
                operation: "lookup",
                ..
            }
        ));

        let err = store.write(&book).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout {
                operation: "write",
                ..
            }
        ));

        drop(guard);

        // The handle keeps working once the connection is free
        assert_eq!(store.lookup(&isbn).await.unwrap(), None);
        let id = store.write(&book).await.unwrap();
        assert!(id > 0);

        // The timed-out write never landed
        let existing = store.lookup(&isbn).await.unwrap().unwrap();
        assert_eq!(existing.count, 1);
    }

    #[tokio::test]
    async fn test_recent_reads_rows_back() {
        let store = store();
        store.write(&record("First", "0000000001", "")).await.unwrap();

        let mut undated = BookRecord::new("Second", Source::OpenLibrary).unwrap();
        undated.isbn13 = "9780000000002".to_string();
        store.write(&undated).await.unwrap();

        let books = store.recent(10).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Second");
        assert_eq!(books[0].source, Some(Source::OpenLibrary));
        assert_eq!(books[0].published_date, None);
        assert_eq!(books[1].title, "First");
        assert_eq!(books[1].published_date, NaiveDate::from_ymd_opt(1955, 1, 1));

        assert_eq!(store.recent(1).await.unwrap().len(), 1);
    }
}
