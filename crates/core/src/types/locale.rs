//! Request locale (language plus optional region).

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a [`Locale`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    /// The input string is empty.
    #[error("locale cannot be empty")]
    Empty,
    /// The language subtag is not two or three ASCII letters.
    #[error("invalid language subtag: {0}")]
    InvalidLanguage(String),
    /// The region subtag is not two ASCII letters.
    #[error("invalid region subtag: {0}")]
    InvalidRegion(String),
}

/// A locale such as `en`, `de-DE` or `en_GB`.
///
/// The language is stored lowercase and the region uppercase, so `de_de`
/// and `de-DE` compare equal. The region doubles as the shipping country
/// when pricing line items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    /// Parse a locale tag. Accepts `-` or `_` as separator; any subtags after
    /// the region (scripts, variants) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the language or region subtag is malformed.
    pub fn parse(tag: &str) -> Result<Self, LocaleError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(LocaleError::Empty);
        }

        let mut parts = tag.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(LocaleError::InvalidLanguage(language.to_owned()));
        }

        let region = match parts.next() {
            Some(region) if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(region.to_ascii_uppercase())
            }
            Some(region) => return Err(LocaleError::InvalidRegion(region.to_owned())),
            None => None,
        };

        Ok(Self {
            language: language.to_ascii_lowercase(),
            region,
        })
    }

    /// Language subtag, lowercase (e.g. `de`).
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Region subtag, uppercase (e.g. `DE`), if present.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{region}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_only() {
        let locale = Locale::parse("en").unwrap();
        assert_eq!(locale.language(), "en");
        assert_eq!(locale.region(), None);
        assert_eq!(locale.to_string(), "en");
    }

    #[test]
    fn test_parse_normalizes_case_and_separator() {
        assert_eq!(Locale::parse("de_de").unwrap(), Locale::parse("DE-DE").unwrap());
        assert_eq!(Locale::parse("de_de").unwrap().to_string(), "de-DE");
    }

    #[test]
    fn test_parse_ignores_script_subtags() {
        let locale = Locale::parse("sr-RS-latn").unwrap();
        assert_eq!(locale.region(), Some("RS"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Locale::parse("  "), Err(LocaleError::Empty));
        assert!(matches!(
            Locale::parse("english"),
            Err(LocaleError::InvalidLanguage(_))
        ));
        assert!(matches!(
            Locale::parse("en-419"),
            Err(LocaleError::InvalidRegion(_))
        ));
    }
}
