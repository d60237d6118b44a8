//! Book (catalog entry) model and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::lang::Lang;

/// Primary language of the physical catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookLanguage {
    English,
    Arabic,
}

impl BookLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookLanguage::English => "english",
            BookLanguage::Arabic => "arabic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "english" => Some(BookLanguage::English),
            "arabic" => Some(BookLanguage::Arabic),
            _ => None,
        }
    }
}

/// Catalog entry, including bilingual description state.
///
/// `description_en` / `description_ar` are filled lazily by the description
/// completion pipeline; `description_fetched` records that completion has
/// been attempted so reads do not retry it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub language: BookLanguage,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_fetched: bool,
    pub categories: Vec<String>,
    pub book_count: i32,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub cover_image: Option<String>,
    pub publication_date: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// New catalog entry (manual insert or provider import).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub language: BookLanguage,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub description_fetched: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    pub book_count: i32,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
}

/// Partial catalog edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<BookLanguage>,
    pub categories: Option<Vec<String>>,
    pub book_count: Option<i32>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub cover_image: Option<String>,
    pub publication_date: Option<String>,
}

/// Catalog metadata recovered from the external provider. Applied
/// fill-only-if-null so manual edits are never clobbered.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub cover_image: Option<String>,
    pub publication_date: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.isbn.is_none()
            && self.publisher.is_none()
            && self.page_count.is_none()
            && self.cover_image.is_none()
            && self.publication_date.is_none()
    }
}

/// Book view returned to clients, with the description resolved for the
/// requested display language.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub language: BookLanguage,
    /// Description in the requested language, falling back to the other
    /// language when only one is populated.
    pub description: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub categories: Vec<String>,
    pub book_count: i32,
    pub available_copies: i64,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub cover_image: Option<String>,
    pub publication_date: Option<String>,
}

impl BookDetails {
    /// Build the client view, resolving the display description for `lang`.
    pub fn from_book(book: Book, lang: Lang, available_copies: i64) -> Self {
        let description = match lang {
            Lang::Ar => book.description_ar.clone().or_else(|| book.description_en.clone()),
            Lang::En => book.description_en.clone().or_else(|| book.description_ar.clone()),
        };
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            language: book.language,
            description,
            description_en: book.description_en,
            description_ar: book.description_ar,
            categories: book.categories,
            book_count: book.book_count,
            available_copies,
            isbn: book.isbn,
            publisher: book.publisher,
            page_count: book.page_count,
            cover_image: book.cover_image,
            publication_date: book.publication_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(en: Option<&str>, ar: Option<&str>) -> Book {
        Book {
            id: 1,
            title: "Title".into(),
            author: "Author".into(),
            language: BookLanguage::English,
            description_en: en.map(String::from),
            description_ar: ar.map(String::from),
            description_fetched: true,
            categories: vec![],
            book_count: 1,
            isbn: None,
            publisher: None,
            page_count: None,
            cover_image: None,
            publication_date: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_description_prefers_requested_language() {
        let details = BookDetails::from_book(book(Some("hello"), Some("مرحبا")), Lang::Ar, 1);
        assert_eq!(details.description.as_deref(), Some("مرحبا"));
    }

    #[test]
    fn test_description_cross_language_fallback() {
        let details = BookDetails::from_book(book(Some("hello"), None), Lang::Ar, 1);
        assert_eq!(details.description.as_deref(), Some("hello"));

        let details = BookDetails::from_book(book(None, None), Lang::En, 1);
        assert_eq!(details.description, None);
    }
}
