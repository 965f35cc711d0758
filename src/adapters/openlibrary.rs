//! OpenLibrary books API.
//!
//! `GET {base}/api/books?bibkeys=ISBN:<isbn>&jscmd=details&format=json`
//! returns an object keyed by bibkey:
//!
//! ```json
//! {
//!   "ISBN:9780140449136": {
//!     "bib_key": "ISBN:9780140449136",
//!     "info_url": "https://openlibrary.org/books/OL7353617M/...",
//!     "thumbnail_url": "https://covers.openlibrary.org/b/id/...-S.jpg",
//!     "details": { "title": "...", "publishers": ["..."], ... }
//!   }
//! }
//! ```
//!
//! The `details` tree has no fixed schema, so every content field goes
//! through [`extract`]. `info_url` and `thumbnail_url` sit next to
//! `details` and are always present in a real response.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use super::{get_json, trim_base_url, Provider, ProviderError, ShapeViolation};
use crate::core::dates;
use crate::core::extract::extract;
use crate::domain::{BookRecord, Isbn, Source};

/// Public API endpoint
pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

/// Turn a books API response into a record.
///
/// Not found when the response has no entry, the entry has no `details`,
/// or `details` has no usable title. A missing `thumbnail_url` or
/// `info_url` is a [`ShapeViolation`].
pub fn resolve(response: &Value, today: NaiveDate) -> Result<Option<BookRecord>, ShapeViolation> {
    let Some(entry) = response.as_object().and_then(|map| map.values().next()) else {
        return Ok(None);
    };
    let Some(details) = entry.get("details") else {
        return Ok(None);
    };
    let Some(title) = extract(details, "title") else {
        return Ok(None);
    };
    let Some(mut record) = BookRecord::new(title, Source::OpenLibrary) else {
        return Ok(None);
    };

    record.subtitle = extract(details, "subtitle").unwrap_or_default();
    record.description = extract(details, "description").unwrap_or_default();
    record.authors = extract(details, "by_statement").unwrap_or_default();
    record.publisher = extract(details, "publishers").unwrap_or_default();
    record.categories = extract(details, "subjects").unwrap_or_default();
    record.isbn13 = extract(details, "isbn_13").unwrap_or_default();
    record.isbn10 = extract(details, "isbn_10").unwrap_or_default();
    record.published_date = extract(details, "publish_date").map(|raw| dates::normalize(&raw, today));

    record.thumbnail = required_str(entry, "thumbnail_url")?;
    record.self_link = required_str(entry, "info_url")?;

    Ok(Some(record))
}

fn required_str(entry: &Value, field: &'static str) -> Result<String, ShapeViolation> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ShapeViolation { field })
}

/// OpenLibrary client
pub struct OpenLibrary {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibrary {
    /// Create a client against `base_url` (e.g. [`DEFAULT_BASE_URL`])
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
        }
    }

    /// Fetch the raw books API response for `isbn`
    pub async fn fetch(&self, isbn: &Isbn) -> Result<Value, ProviderError> {
        let url = format!("{}/api/books", self.base_url);
        let request = self.client.get(&url).query(&[
            ("bibkeys", format!("ISBN:{}", isbn)),
            ("jscmd", "details".to_string()),
            ("format", "json".to_string()),
        ]);

        get_json(request).await
    }
}

#[async_trait]
impl Provider for OpenLibrary {
    fn source(&self) -> Source {
        Source::OpenLibrary
    }

    async fn lookup(
        &self,
        isbn: &Isbn,
        today: NaiveDate,
    ) -> Result<Option<BookRecord>, ProviderError> {
        let response = self.fetch(isbn).await?;
        debug!(
            entries = response.as_object().map(|m| m.len()).unwrap_or(0),
            "OpenLibrary responded"
        );
        Ok(resolve(&response, today)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn entry(details: Value) -> Value {
        json!({
            "ISBN:9780140449136": {
                "bib_key": "ISBN:9780140449136",
                "info_url": "https://openlibrary.org/books/OL1M/The_Republic",
                "thumbnail_url": "https://covers.openlibrary.org/b/id/1-S.jpg",
                "preview": "noview",
                "details": details
            }
        })
    }

    #[test]
    fn test_resolve_full_details() {
        let response = entry(json!({
            "title": "The Republic",
            "subtitle": "Penguin Classics",
            "description": { "type": "/type/text", "value": "A dialogue." },
            "by_statement": "Plato ; translated by Desmond Lee",
            "publishers": ["Penguin Books", "Penguin Classics"],
            "subjects": ["Philosophy", "Justice"],
            "isbn_13": ["9780140449136"],
            "isbn_10": ["0140449132"],
            "publish_date": "January 30, 2003"
        }));

        let record = resolve(&response, today()).unwrap().unwrap();
        assert_eq!(record.title, "The Republic");
        assert_eq!(record.subtitle, "Penguin Classics");
        assert_eq!(record.description, "A dialogue.");
        assert_eq!(record.authors, "Plato ; translated by Desmond Lee");
        assert_eq!(record.publisher, "Penguin Books,Penguin Classics");
        assert_eq!(record.categories, "Philosophy,Justice");
        assert_eq!(record.isbn13, "9780140449136");
        assert_eq!(record.isbn10, "0140449132");
        assert_eq!(record.published_date, NaiveDate::from_ymd_opt(2003, 1, 30));
        assert_eq!(record.thumbnail, "https://covers.openlibrary.org/b/id/1-S.jpg");
        assert_eq!(record.self_link, "https://openlibrary.org/books/OL1M/The_Republic");
        assert_eq!(record.source, Source::OpenLibrary);
    }

    #[test]
    fn test_missing_details_is_not_found() {
        let response = json!({
            "ISBN:9780140449136": {
                "info_url": "https://openlibrary.org/books/OL1M",
                "thumbnail_url": "https://covers.openlibrary.org/b/id/1-S.jpg"
            }
        });
        assert_eq!(resolve(&response, today()).unwrap(), None);
    }

    #[test]
    fn test_empty_response_is_not_found() {
        assert_eq!(resolve(&json!({}), today()).unwrap(), None);
        assert_eq!(resolve(&json!([]), today()).unwrap(), None);
    }

    #[test]
    fn test_missing_title_is_not_found() {
        let response = entry(json!({ "publishers": ["Penguin"] }));
        assert_eq!(resolve(&response, today()).unwrap(), None);
    }

    #[test]
    fn test_missing_publish_date_stays_unset() {
        let response = entry(json!({ "title": "Undated" }));
        let record = resolve(&response, today()).unwrap().unwrap();
        assert_eq!(record.published_date, None);
    }

    #[test]
    fn test_partial_publish_date_falls_back_to_today() {
        let response = entry(json!({ "title": "Year only", "publish_date": "1955" }));
        let record = resolve(&response, today()).unwrap().unwrap();
        assert_eq!(record.published_date, Some(today()));
    }

    #[test]
    fn test_missing_thumbnail_is_shape_violation() {
        let response = json!({
            "ISBN:1": {
                "info_url": "https://openlibrary.org/books/OL1M",
                "details": { "title": "No cover" }
            }
        });
        let err = resolve(&response, today()).unwrap_err();
        assert_eq!(err.field, "thumbnail_url");
    }

    #[test]
    fn test_non_string_info_url_is_shape_violation() {
        let response = json!({
            "ISBN:1": {
                "info_url": 12,
                "thumbnail_url": "https://covers.openlibrary.org/b/id/1-S.jpg",
                "details": { "title": "Bad link" }
            }
        });
        let err = resolve(&response, today()).unwrap_err();
        assert_eq!(err.field, "info_url");
    }
}
