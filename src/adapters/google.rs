//! Google Books volumes API.
//!
//! `GET {base}/volumes?q=isbn:<isbn>` returns a ranked list of volumes.
//! The first volume is trusted; the rest are ignored.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{get_json, trim_base_url, Provider, ProviderError};
use crate::core::dates;
use crate::domain::{BookRecord, Isbn, Source};

/// Public API endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

const ISBN_13: &str = "ISBN_13";
const ISBN_10: &str = "ISBN_10";

/// Top-level search response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub total_items: i64,
    #[serde(deserialize_with = "nullable")]
    pub items: Vec<Volume>,
}

/// One search hit
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Volume {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub self_link: String,
    #[serde(deserialize_with = "nullable")]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub subtitle: String,
    #[serde(deserialize_with = "nullable")]
    pub authors: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub publisher: String,
    #[serde(deserialize_with = "nullable")]
    pub published_date: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub industry_identifiers: Vec<IndustryIdentifier>,
    #[serde(deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub image_links: ImageLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndustryIdentifier {
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(deserialize_with = "nullable")]
    pub small_thumbnail: String,
    #[serde(deserialize_with = "nullable")]
    pub thumbnail: String,
}

/// Explicit `null` decodes like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Turn a volumes response into a record.
///
/// Not found when `totalItems < 1`, when the item list is empty, or when
/// the first volume has no title. The publication date is always set,
/// falling back to `today`.
pub fn resolve(response: &VolumesResponse, today: NaiveDate) -> Option<BookRecord> {
    if response.total_items < 1 {
        return None;
    }

    let volume = response.items.first()?;
    let info = &volume.volume_info;

    let mut record = BookRecord::new(info.title.clone(), Source::Google)?;
    record.subtitle = info.subtitle.clone();
    record.description = info.description.clone();
    record.publisher = info.publisher.clone();
    record.thumbnail = info.image_links.thumbnail.clone();
    record.published_date = Some(dates::normalize(&info.published_date, today));
    record.self_link = volume.self_link.clone();
    record.categories = info.categories.join(",");
    record.authors = info.authors.join(",");
    record.isbn13 = identifier(&info.industry_identifiers, ISBN_13);
    record.isbn10 = identifier(&info.industry_identifiers, ISBN_10);

    Some(record)
}

/// First identifier of the given type, or empty
fn identifier(identifiers: &[IndustryIdentifier], kind: &str) -> String {
    identifiers
        .iter()
        .find(|id| id.kind == kind)
        .map(|id| id.identifier.clone())
        .unwrap_or_default()
}

/// Google Books client
pub struct GoogleBooks {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooks {
    /// Create a client against `base_url` (e.g. [`DEFAULT_BASE_URL`])
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
        }
    }

    /// Fetch the raw volumes response for `isbn`
    pub async fn fetch(&self, isbn: &Isbn) -> Result<VolumesResponse, ProviderError> {
        let url = format!("{}/volumes", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("q", format!("isbn:{}", isbn))]);

        get_json(request).await
    }
}

#[async_trait]
impl Provider for GoogleBooks {
    fn source(&self) -> Source {
        Source::Google
    }

    async fn lookup(
        &self,
        isbn: &Isbn,
        today: NaiveDate,
    ) -> Result<Option<BookRecord>, ProviderError> {
        let response = self.fetch(isbn).await?;
        debug!(total_items = response.total_items, "Google Books responded");
        Ok(resolve(&response, today))
    }
}
