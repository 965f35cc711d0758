//! Domain types for the resolver.
//!
//! - Isbn: validated lookup identifier
//! - BookRecord: canonical metadata produced by a provider
//! - ExistingBook / StoredBook: what the store hands back

pub mod book;
pub mod isbn;

pub use book::{BookRecord, ExistingBook, Source, StoredBook};
pub use isbn::{InvalidIsbn, Isbn, MIN_ISBN_LEN};
