//! tsundoku - Resolve ISBNs into normalized book metadata
//!
//! Looks an ISBN up in a local SQLite library and, when it is not there
//! yet, asks external catalogs for metadata and stores the first usable
//! answer.
//!
//! # Architecture
//!
//! - Providers are tried in priority order (Google Books, then
//!   OpenLibrary) and the first record wins
//! - Each provider response is reconciled into one canonical `BookRecord`
//! - A record is written once per resolution; an ISBN already in the
//!   store short-circuits the lookup
//!
//! # Modules
//!
//! - `adapters`: Catalog providers (Google Books, OpenLibrary)
//! - `core`: Resolution pipeline, store, date and field helpers
//! - `domain`: Data structures (Isbn, BookRecord, Source)
//! - `cli`: Command-line interface and interactive session
//!
//! # Usage
//!
//! ```bash
//! # Interactive entry
//! tsundoku session
//!
//! # One-shot
//! tsundoku resolve 9780140449136
//!
//! # What's stored
//! tsundoku list
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{GoogleBooks, OpenLibrary, Provider, ProviderError, ShapeViolation};
pub use crate::core::{Outcome, ResolveError, ResolveMode, Resolver, SqliteStore, Store, StoreError};
pub use domain::{BookRecord, ExistingBook, Isbn, Source};
