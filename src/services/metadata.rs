//! External book-metadata provider (Google-Books-style volumes API).
//!
//! The core only depends on the description text, its natural language, and
//! a handful of catalog fields backfilled into the store.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MetadataConfig;
use crate::error::{AppError, AppResult};

/// One volume as recovered from the provider.
#[derive(Debug, Clone, Default)]
pub struct FetchedVolume {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub cover_image: Option<String>,
    pub published_date: Option<String>,
}

/// Provider seam; production uses [`GoogleBooksProvider`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up the best-matching volume for a title, optionally narrowed by
    /// author. `Ok(None)` means the provider had no match.
    async fn fetch_volume(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> AppResult<Option<FetchedVolume>>;
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(rename = "totalItems", default)]
    total_items: i64,
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Deserialize)]
struct VolumeItem {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    publisher: Option<String>,
    page_count: Option<i32>,
    published_date: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
}

/// Prefer ISBN-13, fall back to ISBN-10.
fn extract_isbn(identifiers: &[IndustryIdentifier]) -> Option<String> {
    identifiers
        .iter()
        .find(|id| id.kind == "ISBN_13")
        .or_else(|| identifiers.iter().find(|id| id.kind == "ISBN_10"))
        .map(|id| id.identifier.clone())
}

impl From<VolumeInfo> for FetchedVolume {
    fn from(info: VolumeInfo) -> Self {
        let isbn = extract_isbn(&info.industry_identifiers);
        FetchedVolume {
            title: info.title,
            authors: info.authors,
            description: info.description,
            language: info.language,
            categories: info.categories,
            isbn,
            publisher: info.publisher,
            page_count: info.page_count,
            cover_image: info.image_links.and_then(|links| links.thumbnail),
            published_date: info.published_date,
        }
    }
}

/// Google Books volumes client.
pub struct GoogleBooksProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksProvider {
    pub fn new(config: &MetadataConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    async fn fetch_volume(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> AppResult<Option<FetchedVolume>> {
        let mut query = format!("intitle:{}", title);
        if let Some(author) = author {
            query.push_str(&format!("+inauthor:{}", author));
        }

        let url = format!("{}/volumes", self.base_url);
        let mut params: Vec<(&str, &str)> = vec![("q", &query), ("langRestrict", "en")];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("key", key));
        }

        tracing::debug!("Querying metadata provider for '{}'", title);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Metadata provider: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::ExternalService(format!("Metadata provider: {}", e)))?;

        let body: VolumesResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Metadata provider: {}", e)))?;

        if body.total_items == 0 {
            return Ok(None);
        }
        Ok(body.items.into_iter().next().map(|item| item.volume_info.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn_prefers_isbn13() {
        let ids = vec![
            IndustryIdentifier {
                kind: "ISBN_10".to_string(),
                identifier: "0140449132".to_string(),
            },
            IndustryIdentifier {
                kind: "ISBN_13".to_string(),
                identifier: "9780140449136".to_string(),
            },
        ];
        assert_eq!(extract_isbn(&ids).as_deref(), Some("9780140449136"));
    }

    #[test]
    fn test_isbn_falls_back_to_isbn10() {
        let ids = vec![IndustryIdentifier {
            kind: "ISBN_10".to_string(),
            identifier: "0140449132".to_string(),
        }];
        assert_eq!(extract_isbn(&ids).as_deref(), Some("0140449132"));
    }

    #[test]
    fn test_volume_response_parsing() {
        let json = r#"{
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "The Histories",
                    "authors": ["Herodotus"],
                    "description": "An account of the Greco-Persian Wars.",
                    "language": "en",
                    "pageCount": 716,
                    "publisher": "Penguin",
                    "industryIdentifiers": [
                        {"type": "ISBN_13", "identifier": "9780140449136"}
                    ],
                    "imageLinks": {"thumbnail": "http://example.org/t.jpg"}
                }
            }]
        }"#;
        let parsed: VolumesResponse = serde_json::from_str(json).unwrap();
        let volume: FetchedVolume = parsed.items.into_iter().next().unwrap().volume_info.into();
        assert_eq!(volume.title.as_deref(), Some("The Histories"));
        assert_eq!(volume.page_count, Some(716));
        assert_eq!(volume.isbn.as_deref(), Some("9780140449136"));
        assert_eq!(volume.cover_image.as_deref(), Some("http://example.org/t.jpg"));
    }
}
