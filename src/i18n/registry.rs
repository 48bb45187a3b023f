//! Locale registry: single source of truth for the supported locale set.
//!
//! One source locale plus five target locales. Adding a locale means adding
//! one entry to `default_locales` below; every component consults this table.

use std::sync::OnceLock;

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// ISO 639-1 language code (e.g., "en", "es", "fr")
    pub code: &'static str,

    /// English name of the language (e.g., "Spanish")
    pub name: &'static str,

    /// Native name of the language (e.g., "Español")
    pub native_name: &'static str,

    /// Whether this is the source locale content is authored in (exactly one)
    pub is_source: bool,

    /// Whether this locale is enabled for resolution and translation
    pub enabled: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global registry instance, initializing it on first access.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// All enabled locales, source first.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|l| l.enabled).collect()
    }

    /// All enabled target locales (everything except the source).
    pub fn targets(&self) -> Vec<&LocaleConfig> {
        self.locales
            .iter()
            .filter(|l| l.enabled && !l.is_source)
            .collect()
    }

    /// The source locale configuration.
    ///
    /// # Panics
    /// Panics if the registry does not contain exactly one source locale,
    /// which indicates a configuration error.
    pub fn source(&self) -> &LocaleConfig {
        let sources: Vec<_> = self.locales.iter().filter(|l| l.is_source).collect();
        match sources.len() {
            0 => panic!("No source locale found in registry"),
            1 => sources[0],
            _ => panic!("Multiple source locales found in registry"),
        }
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code).map(|l| l.enabled).unwrap_or(false)
    }
}

fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_source: true,
            enabled: true,
        },
        LocaleConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "pt",
            name: "Portuguese",
            native_name: "Português",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ja",
            name: "Japanese",
            native_name: "日本語",
            is_source: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_singleton() {
        let r1 = LocaleRegistry::get();
        let r2 = LocaleRegistry::get();
        assert!(std::ptr::eq(r1, r2));
    }

    #[test]
    fn test_get_by_code_english() {
        let config = LocaleRegistry::get().get_by_code("en").unwrap();
        assert_eq!(config.name, "English");
        assert!(config.is_source);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_unknown() {
        assert!(LocaleRegistry::get().get_by_code("zz").is_none());
    }

    #[test]
    fn test_list_enabled_has_six_locales() {
        let enabled = LocaleRegistry::get().list_enabled();
        assert_eq!(enabled.len(), 6);
    }

    #[test]
    fn test_targets_excludes_source() {
        let targets = LocaleRegistry::get().targets();
        assert_eq!(targets.len(), 5);
        assert!(targets.iter().all(|l| !l.is_source));
        for code in ["es", "fr", "de", "pt", "ja"] {
            assert!(targets.iter().any(|l| l.code == code), "missing {}", code);
        }
    }

    #[test]
    fn test_source_is_english() {
        assert_eq!(LocaleRegistry::get().source().code, "en");
    }

    #[test]
    fn test_is_enabled() {
        let registry = LocaleRegistry::get();
        assert!(registry.is_enabled("ja"));
        assert!(!registry.is_enabled("it"));
    }
}
