//! Language tags and script detection for bilingual catalog content.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fraction of Arabic-block characters above which a text is classified
/// as Arabic.
pub const ARABIC_RATIO_THRESHOLD: f64 = 0.3;

/// Display/translation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ar,
}

impl Lang {
    /// ISO 639-1 code used in translation requests and query strings.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ar => "ar",
        }
    }

    /// Parse a query-string language code. Anything other than `ar`
    /// falls back to English, matching the catalog default.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ar" => Lang::Ar,
            _ => Lang::En,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Lang::En => Lang::Ar,
            Lang::Ar => Lang::En,
        }
    }
}

/// Result of script classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Arabic,
    Mixed,
}

fn is_arabic_char(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c)
}

/// Classify a text by the share of characters in the Arabic Unicode block.
///
/// A ratio above [`ARABIC_RATIO_THRESHOLD`] classifies the text as Arabic;
/// any Arabic characters below the threshold yield `Mixed`. Empty text is
/// Latin.
pub fn detect_script(text: &str) -> Script {
    let total = text.chars().count();
    if total == 0 {
        return Script::Latin;
    }
    let arabic = text.chars().filter(|c| is_arabic_char(*c)).count();
    let ratio = arabic as f64 / total as f64;
    if ratio > ARABIC_RATIO_THRESHOLD {
        Script::Arabic
    } else if arabic > 0 {
        Script::Mixed
    } else {
        Script::Latin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_latin() {
        assert_eq!(detect_script("A history of modern Egypt"), Script::Latin);
    }

    #[test]
    fn test_detect_arabic() {
        assert_eq!(detect_script("تاريخ مصر الحديث"), Script::Arabic);
    }

    #[test]
    fn test_detect_mixed_below_threshold() {
        // One Arabic word inside a long English sentence stays below 30%.
        let text = "The term كتاب appears frequently in classical bibliography";
        assert_eq!(detect_script(text), Script::Mixed);
    }

    #[test]
    fn test_detect_empty() {
        assert_eq!(detect_script(""), Script::Latin);
    }

    #[test]
    fn test_lang_codes() {
        assert_eq!(Lang::from_code("ar"), Lang::Ar);
        assert_eq!(Lang::from_code("en"), Lang::En);
        assert_eq!(Lang::from_code("fr"), Lang::En);
        assert_eq!(Lang::Ar.other(), Lang::En);
    }
}
