//! Adapter interfaces for external catalog providers.
//!
//! Every provider turns an ISBN into an optional [`BookRecord`]. The
//! resolver holds them in priority order and stops at the first hit.

pub mod google;
pub mod openlibrary;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::{BookRecord, Isbn, Source};

pub use google::GoogleBooks;
pub use openlibrary::OpenLibrary;

/// User agent sent with every provider request
pub const USER_AGENT: &str = concat!("tsundoku/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in [`ProviderError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// A response that parsed but lacks a field the provider guarantees
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("response is missing required field '{field}'")]
pub struct ShapeViolation {
    pub field: &'static str,
}

/// Errors from a single provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ShapeViolation),
}

/// Trait for catalog providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provenance tag for records this provider produces
    fn source(&self) -> Source;

    /// Fetch and resolve metadata for `isbn`.
    ///
    /// `Ok(None)` means the provider has no usable record. `today` is the
    /// fallback publication date.
    async fn lookup(
        &self,
        isbn: &Isbn,
        today: NaiveDate,
    ) -> Result<Option<BookRecord>, ProviderError>;
}

/// Build the HTTP client shared by the providers
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Send a request and decode a JSON body
async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
