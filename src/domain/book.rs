//! Canonical book metadata produced by the providers.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Provider that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Google Books volumes API
    Google,

    /// OpenLibrary books API
    #[serde(rename = "openlibrary")]
    OpenLibrary,
}

impl Source {
    /// Tag stored alongside the record
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenLibrary => "openlibrary",
        }
    }

    /// Parse a stored or configured tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "openlibrary" => Some(Self::OpenLibrary),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized metadata for a single book.
///
/// Built once per resolution attempt and never modified afterwards.
/// `categories` and `authors` hold comma-joined lists in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub publisher: String,
    pub thumbnail: String,

    /// Unset only when OpenLibrary had no extractable publish date
    pub published_date: Option<NaiveDate>,

    pub self_link: String,
    pub categories: String,
    pub authors: String,
    pub isbn10: String,
    pub isbn13: String,
    pub source: Source,
}

impl BookRecord {
    /// Start a record with the required fields.
    ///
    /// Returns `None` for a blank title: such a record is never valid.
    pub fn new(title: impl Into<String>, source: Source) -> Option<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return None;
        }

        Some(Self {
            title,
            subtitle: String::new(),
            description: String::new(),
            publisher: String::new(),
            thumbnail: String::new(),
            published_date: None,
            self_link: String::new(),
            categories: String::new(),
            authors: String::new(),
            isbn10: String::new(),
            isbn13: String::new(),
            source,
        })
    }
}

/// A positive store lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingBook {
    /// Number of stored rows matching the identifier
    pub count: i64,

    /// Title of the first matching row
    pub title: String,
}

/// A row read back from the store
#[derive(Debug, Clone, Serialize)]
pub struct StoredBook {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub isbn10: String,
    pub isbn13: String,
    pub published_date: Option<NaiveDate>,
    pub source: Option<Source>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_is_rejected() {
        assert!(BookRecord::new("", Source::Google).is_none());
        assert!(BookRecord::new("   ", Source::OpenLibrary).is_none());
    }

    #[test]
    fn test_new_record_is_empty_apart_from_title() {
        let record = BookRecord::new("The Republic", Source::Google).unwrap();
        assert_eq!(record.title, "The Republic");
        assert_eq!(record.source, Source::Google);
        assert!(record.isbn10.is_empty());
        assert!(record.isbn13.is_empty());
        assert!(record.published_date.is_none());
    }

    #[test]
    fn test_source_tags() {
        assert_eq!(Source::Google.to_string(), "google");
        assert_eq!(Source::OpenLibrary.to_string(), "openlibrary");
        assert_eq!(Source::from_tag("OpenLibrary"), Some(Source::OpenLibrary));
        assert_eq!(Source::from_tag("amazon"), None);

        let json = serde_json::to_string(&Source::OpenLibrary).unwrap();
        assert_eq!(json, "\"openlibrary\"");
    }
}
