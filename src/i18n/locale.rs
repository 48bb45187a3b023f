//! Locale type: validated handle into the locale registry.

use crate::i18n::{LocaleConfig, LocaleRegistry};
use anyhow::{bail, Result};

/// A validated locale.
///
/// Only locales present and enabled in the registry can be constructed, so a
/// `Locale` value can always be resolved back to its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    pub const ENGLISH: Locale = Locale { code: "en" };
    pub const SPANISH: Locale = Locale { code: "es" };
    pub const FRENCH: Locale = Locale { code: "fr" };
    pub const GERMAN: Locale = Locale { code: "de" };
    pub const PORTUGUESE: Locale = Locale { code: "pt" };
    pub const JAPANESE: Locale = Locale { code: "ja" };

    /// Create a Locale from an ISO 639-1 code, validating against the registry.
    pub fn from_code(code: &str) -> Result<Locale> {
        match LocaleRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Locale { code: config.code }),
            Some(_) => bail!("Locale '{}' is not enabled", code),
            None => bail!("Unknown locale code: '{}'", code),
        }
    }

    /// The source locale content is authored in.
    pub fn source() -> Locale {
        Locale {
            code: LocaleRegistry::get().source().code,
        }
    }

    /// All enabled locales, source included.
    pub fn all() -> Vec<Locale> {
        LocaleRegistry::get()
            .list_enabled()
            .iter()
            .map(|c| Locale { code: c.code })
            .collect()
    }

    /// All enabled target locales.
    pub fn targets() -> Vec<Locale> {
        LocaleRegistry::get()
            .targets()
            .iter()
            .map(|c| Locale { code: c.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Full configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is absent from the registry, which cannot happen
    /// for a properly constructed `Locale`.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::get()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_source(&self) -> bool {
        self.config().is_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_valid() {
        let locale = Locale::from_code("fr").expect("Should succeed");
        assert_eq!(locale.code(), "fr");
        assert_eq!(locale.name(), "French");
        assert!(!locale.is_source());
    }

    #[test]
    fn test_from_code_invalid() {
        let result = Locale::from_code("xx");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown"));
    }

    #[test]
    fn test_from_code_empty() {
        assert!(Locale::from_code("").is_err());
    }

    #[test]
    fn test_source_is_english() {
        let source = Locale::source();
        assert_eq!(source.code(), "en");
        assert!(source.is_source());
    }

    #[test]
    fn test_constants_match_registry() {
        assert_eq!(Locale::ENGLISH, Locale::from_code("en").unwrap());
        assert_eq!(Locale::JAPANESE, Locale::from_code("ja").unwrap());
    }

    #[test]
    fn test_all_and_targets() {
        assert_eq!(Locale::all().len(), 6);
        let targets = Locale::targets();
        assert_eq!(targets.len(), 5);
        assert!(!targets.contains(&Locale::ENGLISH));
    }

    #[test]
    fn test_native_name() {
        assert_eq!(Locale::GERMAN.native_name(), "Deutsch");
        assert_eq!(Locale::PORTUGUESE.native_name(), "Português");
    }

    #[test]
    fn test_copy_and_equality() {
        let a = Locale::SPANISH;
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, Locale::FRENCH);
    }
}
