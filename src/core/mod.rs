//! Core resolution logic.
//!
//! This module contains:
//! - dates: publication date normalization
//! - extract: field extraction from untyped provider JSON
//! - store: persistence trait and SQLite implementation
//! - resolver: the store-then-providers pipeline

pub mod dates;
pub mod extract;
pub mod resolver;
pub mod store;

// Re-export commonly used types
pub use extract::extract;
pub use resolver::{Outcome, ResolveError, ResolveMode, Resolver};
pub use store::{SqliteStore, Store, StoreError, DEFAULT_STORE_TIMEOUT, MAX_STORE_TIMEOUT};
