//! ISBN resolution pipeline.
//!
//! ```text
//! CheckingExisting ──found──────────────────────────────▶ Done(already stored)
//!        │ absent (or AddAnyway)
//!        ▼
//! provider[0] (Google) ──record──▶ write ──────────────▶ Done(stored)
//!        │ none / shape violation
//!        ▼
//! provider[1] (OpenLibrary) ──record──▶ write ─────────▶ Done(stored)
//!        │ none / shape violation
//!        ▼
//! Done(not found)
//! ```
//!
//! Transport and decode errors abort the attempt; they are not treated as
//! "not found" and do not fall through to the next provider.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{Provider, ProviderError};
use crate::domain::{BookRecord, ExistingBook, InvalidIsbn, Isbn, Source};

use super::store::{Store, StoreError};

/// Errors from a resolution attempt
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidIsbn(#[from] InvalidIsbn),

    #[error("{provider} lookup failed: {error}")]
    Provider {
        provider: Source,
        #[source]
        error: ProviderError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Whether to consult the store before fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Stop early when the identifier is already stored
    #[default]
    CheckExisting,

    /// Fetch and store even if the identifier is already stored
    AddAnyway,
}

/// Final state of a resolution attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The store already holds the identifier; nothing fetched or written
    AlreadyStored(ExistingBook),

    /// A provider produced a record and it was written
    Stored { id: i64, record: BookRecord },

    /// No provider had a usable record; nothing written
    NotFound,
}

/// Resolves identifiers against a store and an ordered list of providers
pub struct Resolver {
    store: Arc<dyn Store>,
    providers: Vec<Box<dyn Provider>>,
}

impl Resolver {
    /// Create a resolver. Providers are tried in the order given.
    pub fn new(store: Arc<dyn Store>, providers: Vec<Box<dyn Provider>>) -> Self {
        Self { store, providers }
    }

    /// Provider order
    pub fn sources(&self) -> Vec<Source> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    /// Validate `raw` and run the whole pipeline
    pub async fn resolve(&self, raw: &str, mode: ResolveMode) -> Result<Outcome, ResolveError> {
        let isbn = Isbn::parse(raw)?;
        self.resolve_isbn(&isbn, mode, Utc::now().date_naive()).await
    }

    /// Run the pipeline for a validated identifier.
    ///
    /// `today` is the fallback publication date for unparseable dates.
    #[instrument(skip(self, isbn), fields(isbn = %isbn))]
    pub async fn resolve_isbn(
        &self,
        isbn: &Isbn,
        mode: ResolveMode,
        today: NaiveDate,
    ) -> Result<Outcome, ResolveError> {
        if mode == ResolveMode::CheckExisting {
            if let Some(existing) = self.check_existing(isbn).await? {
                return Ok(Outcome::AlreadyStored(existing));
            }
        }

        let Some(record) = self.fetch(isbn, today).await? else {
            info!("No provider has a record");
            return Ok(Outcome::NotFound);
        };

        let id = self.save(&record).await?;
        Ok(Outcome::Stored { id, record })
    }

    /// Look the identifier up in the store
    pub async fn check_existing(&self, isbn: &Isbn) -> Result<Option<ExistingBook>, ResolveError> {
        let existing = self.store.lookup(isbn).await?;

        if let Some(ref book) = existing {
            info!(count = book.count, title = %book.title, "Already stored");
        }

        Ok(existing)
    }

    /// Try each provider in order and return the first record.
    ///
    /// Shape violations are logged and treated as "not found" so the next
    /// provider still gets a chance.
    pub async fn fetch(
        &self,
        isbn: &Isbn,
        today: NaiveDate,
    ) -> Result<Option<BookRecord>, ResolveError> {
        for provider in &self.providers {
            let source = provider.source();
            debug!(provider = %source, "Querying provider");

            match provider.lookup(isbn, today).await {
                Ok(Some(record)) => {
                    info!(provider = %source, title = %record.title, "Provider found record");
                    return Ok(Some(record));
                }
                Ok(None) => {
                    debug!(provider = %source, "Provider has no record");
                }
                Err(ProviderError::Shape(violation)) => {
                    warn!(provider = %source, %violation, "Malformed response, treating as not found");
                }
                Err(error) => {
                    return Err(ResolveError::Provider {
                        provider: source,
                        error,
                    });
                }
            }
        }

        Ok(None)
    }

    /// Write a record and return its new id
    pub async fn save(&self, record: &BookRecord) -> Result<i64, ResolveError> {
        let id = self.store.write(record).await?;
        info!(id, title = %record.title, source = %record.source, "Created record");
        Ok(id)
    }
}
