//! Static message bundles: compiled per-locale message trees.
//!
//! Each locale ships a JSON file (`<dir>/<code>.json`) of nested objects that
//! is flattened into dot-path keys at load time. The source-locale bundle is
//! authoritative and must be present; target bundles may be partial or absent.

use crate::i18n::{Locale, LocaleRegistry};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Flattened message trees for every loaded locale.
#[derive(Debug, Clone, Default)]
pub struct BundleSet {
    // locale code -> dot-path key -> message
    messages: HashMap<String, HashMap<String, String>>,
}

impl BundleSet {
    /// Load bundles for all enabled locales from a directory.
    ///
    /// Fails if the source-locale file is missing or malformed; missing
    /// target-locale files only log a warning.
    pub fn load(dir: &str) -> Result<Self> {
        let registry = LocaleRegistry::get();
        let mut messages = HashMap::new();

        for config in registry.list_enabled() {
            let path = Path::new(dir).join(format!("{}.json", config.code));
            match std::fs::read_to_string(&path) {
                Ok(raw) => {
                    let tree: Value = serde_json::from_str(&raw)
                        .with_context(|| format!("Malformed bundle file {}", path.display()))?;
                    let flat = flatten(&tree);
                    debug!("Loaded {} messages for locale {}", flat.len(), config.code);
                    messages.insert(config.code.to_string(), flat);
                }
                Err(e) if config.is_source => {
                    bail!(
                        "Source locale bundle {} is required: {}",
                        path.display(),
                        e
                    );
                }
                Err(_) => {
                    warn!("No bundle file for locale {}, treating as empty", config.code);
                    messages.insert(config.code.to_string(), HashMap::new());
                }
            }
        }

        Ok(Self { messages })
    }

    /// Build a set directly from in-memory JSON trees. The source locale must
    /// be among the provided values.
    pub fn from_values(values: Vec<(Locale, Value)>) -> Result<Self> {
        let mut messages = HashMap::new();
        for (locale, tree) in values {
            messages.insert(locale.code().to_string(), flatten(&tree));
        }
        if !messages.contains_key(Locale::source().code()) {
            bail!("Source locale bundle is required");
        }
        Ok(Self { messages })
    }

    /// Look up a message by dot-path key. Empty strings count as missing.
    pub fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.messages
            .get(locale.code())
            .and_then(|m| m.get(key))
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// All keys under `prefix.` in the given locale's tree.
    pub fn keys_under(&self, locale: Locale, prefix: &str) -> Vec<String> {
        let needle = format!("{}.", prefix);
        self.messages
            .get(locale.code())
            .map(|m| {
                m.keys()
                    .filter(|k| k.starts_with(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn message_count(&self, locale: Locale) -> usize {
        self.messages.get(locale.code()).map(|m| m.len()).unwrap_or(0)
    }
}

/// Flatten a nested JSON object into dot-path keys. Non-string leaves are
/// skipped: bundles carry display strings only.
fn flatten(tree: &Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into(tree, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_into(v, key, out);
            }
        }
        Value::String(s) => {
            if !prefix.is_empty() {
                out.insert(prefix, s.clone());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_bundles() -> BundleSet {
        BundleSet::from_values(vec![
            (
                Locale::ENGLISH,
                json!({
                    "hero": {"title": "Welcome", "subtitle": "Build things"},
                    "nav": {"home": "Home", "about": "About"}
                }),
            ),
            (
                Locale::SPANISH,
                json!({
                    "hero": {"title": "Bienvenido"},
                    "nav": {"home": "Inicio"}
                }),
            ),
        ])
        .expect("Should build")
    }

    #[test]
    fn test_lookup_source() {
        let bundles = test_bundles();
        assert_eq!(bundles.lookup(Locale::ENGLISH, "hero.title"), Some("Welcome"));
        assert_eq!(bundles.lookup(Locale::ENGLISH, "nav.about"), Some("About"));
    }

    #[test]
    fn test_lookup_partial_target() {
        let bundles = test_bundles();
        assert_eq!(
            bundles.lookup(Locale::SPANISH, "hero.title"),
            Some("Bienvenido")
        );
        // Missing in the Spanish bundle: lookup reports absence, fallback
        // decisions belong to the resolver.
        assert_eq!(bundles.lookup(Locale::SPANISH, "hero.subtitle"), None);
    }

    #[test]
    fn test_lookup_unloaded_locale_is_empty() {
        let bundles = test_bundles();
        assert_eq!(bundles.lookup(Locale::JAPANESE, "hero.title"), None);
    }

    #[test]
    fn test_lookup_unknown_key() {
        let bundles = test_bundles();
        assert_eq!(bundles.lookup(Locale::ENGLISH, "does.not.exist"), None);
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let bundles = BundleSet::from_values(vec![(
            Locale::ENGLISH,
            json!({"hero": {"title": "  "}}),
        )])
        .unwrap();
        assert_eq!(bundles.lookup(Locale::ENGLISH, "hero.title"), None);
    }

    #[test]
    fn test_from_values_requires_source() {
        let result = BundleSet::from_values(vec![(
            Locale::SPANISH,
            json!({"hero": {"title": "Hola"}}),
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_keys_under() {
        let bundles = test_bundles();
        let mut keys = bundles.keys_under(Locale::ENGLISH, "nav");
        keys.sort();
        assert_eq!(keys, vec!["nav.about", "nav.home"]);
    }

    #[test]
    fn test_keys_under_no_prefix_match() {
        let bundles = test_bundles();
        assert!(bundles.keys_under(Locale::ENGLISH, "footer").is_empty());
    }

    #[test]
    fn test_flatten_skips_non_string_leaves() {
        let flat = flatten(&json!({"a": {"b": 42, "c": "text", "d": [1, 2]}}));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.get("a.c").map(String::as_str), Some("text"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("en.json"),
            r#"{"hero": {"title": "Hello"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("es.json"), r#"{"hero": {"title": "Hola"}}"#).unwrap();

        let bundles = BundleSet::load(dir.path().to_str().unwrap()).expect("load");
        assert_eq!(bundles.lookup(Locale::ENGLISH, "hero.title"), Some("Hello"));
        assert_eq!(bundles.lookup(Locale::SPANISH, "hero.title"), Some("Hola"));
        // fr/de/pt/ja absent: empty, not an error
        assert_eq!(bundles.message_count(Locale::FRENCH), 0);
    }

    #[test]
    fn test_load_missing_source_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("es.json"), r#"{"a": "b"}"#).unwrap();

        let result = BundleSet::load(dir.path().to_str().unwrap());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Source locale"));
    }

    #[test]
    fn test_load_malformed_source_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("en.json"), "{not json").unwrap();

        assert!(BundleSet::load(dir.path().to_str().unwrap()).is_err());
    }
}
