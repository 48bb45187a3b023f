//! Merges content overrides, stored translations, and static bundles into
//! final locale-correct content.
//!
//! Precedence for any key/locale pair, highest first:
//! 1. non-hidden ContentRecord override
//! 2. TranslationRecord value for the requested locale
//! 3. TranslationRecord value for the source locale
//! 4. static bundle value for the requested locale
//! 5. static bundle value for the source locale
//! 6. caller-supplied fallback literal
//!
//! A source with an empty or missing value is skipped, never served; only an
//! override that is explicitly present and hidden masks lower sources.

use crate::content::{
    collapse_hidden_map, parse_hidden_flag, ContentPayload, HIDDEN_SUFFIX,
    TRANSLATIONS_HIDDEN_SUFFIX,
};
use crate::db::Database;
use crate::defaults::DefaultsCatalog;
use crate::i18n::{BundleSet, Locale};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub struct Resolver {
    db: Database,
    bundles: BundleSet,
    defaults: DefaultsCatalog,
}

impl Resolver {
    pub fn new(db: Database, bundles: BundleSet, defaults: DefaultsCatalog) -> Self {
        Self {
            db,
            bundles,
            defaults,
        }
    }

    /// Resolve one dot-path key for one locale. Total: returns the fallback
    /// literal when no source has a value. Pure read, no side effects.
    pub fn resolve(&self, locale: Locale, key: &str, fallback: &str) -> Result<String> {
        let source = Locale::source();

        // (1) content override, unless hidden
        if let Some((section, tag)) = key.split_once('.') {
            if !self.is_field_hidden(section, tag)? {
                if let Some(record) = self.db.get_content(section, tag)? {
                    let payload = ContentPayload::parse(&record.value);
                    if let Some(text) = payload.text_for_locale(locale.code(), source.code()) {
                        return Ok(text.to_string());
                    }
                }
            }
        }

        // (2) + (3) stored translations
        if let Some(record) = self.db.get_translation(key)? {
            if let Some(value) = record.value(locale) {
                return Ok(value.to_string());
            }
            if let Some(value) = record.value(source) {
                return Ok(value.to_string());
            }
        }

        // (4) + (5) static bundles
        if let Some(value) = self.bundles.lookup(locale, key) {
            return Ok(value.to_string());
        }
        if let Some(value) = self.bundles.lookup(source, key) {
            return Ok(value.to_string());
        }

        // (6) caller literal
        Ok(fallback.to_string())
    }

    /// Resolve every known field of a section for one locale.
    ///
    /// Scalar fields go through `resolve`; structured fields serve their
    /// override whole or fall back to the defaults catalog. Hidden flags are
    /// collapsed into a single `<field>_hidden` sibling per field.
    pub fn resolve_section(&self, locale: Locale, section: &str) -> Result<Value> {
        let mut out = Map::new();

        for field in self.known_fields(section)? {
            let hidden = self.is_field_hidden(section, &field)?;
            if hidden {
                // Present-and-hidden masks every lower-precedence source.
                out.insert(field.clone(), Value::String(String::new()));
                out.insert(format!("{}{}", field, HIDDEN_SUFFIX), Value::Bool(true));
                continue;
            }

            let override_payload = self
                .db
                .get_content(section, &field)?
                .map(|r| ContentPayload::parse(&r.value));

            let value = match override_payload {
                Some(payload) if payload.is_structured() => payload.to_value(),
                Some(payload) => {
                    match payload.text_for_locale(locale.code(), Locale::source().code()) {
                        Some(text) => Value::String(text.to_string()),
                        None => Value::String(self.resolve_below_override(locale, section, &field)?),
                    }
                }
                None => match self.defaults.synthesize(section, &field) {
                    Some(default) => default,
                    None => Value::String(self.resolve_below_override(locale, section, &field)?),
                },
            };

            out.insert(field.clone(), value);
            out.insert(format!("{}{}", field, HIDDEN_SUFFIX), Value::Bool(false));
        }

        Ok(Value::Object(out))
    }

    /// The scalar chain below the override level: translations, bundles, "".
    fn resolve_below_override(&self, locale: Locale, section: &str, field: &str) -> Result<String> {
        let source = Locale::source();
        let key = format!("{}.{}", section, field);

        if let Some(record) = self.db.get_translation(&key)? {
            if let Some(value) = record.value(locale) {
                return Ok(value.to_string());
            }
            if let Some(value) = record.value(source) {
                return Ok(value.to_string());
            }
        }
        if let Some(value) = self.bundles.lookup(locale, &key) {
            return Ok(value.to_string());
        }
        if let Some(value) = self.bundles.lookup(source, &key) {
            return Ok(value.to_string());
        }
        Ok(String::new())
    }

    /// Union of field names known for a section: content overrides, stored
    /// translation keys, source-bundle keys, and defaults-catalog fields.
    /// Hidden-flag metadata tags are not fields themselves.
    fn known_fields(&self, section: &str) -> Result<Vec<String>> {
        let mut fields = BTreeSet::new();

        for record in self.db.list_content_for_section(section)? {
            if !is_hidden_metadata_tag(&record.tag) {
                fields.insert(record.tag);
            }
        }

        let prefix = format!("{}.", section);
        for record in self.db.translations_for_section(section)? {
            let field = record.key[prefix.len()..].to_string();
            if !is_hidden_metadata_tag(&field) {
                fields.insert(field);
            }
        }

        for key in self.bundles.keys_under(Locale::source(), section) {
            fields.insert(key[prefix.len()..].to_string());
        }

        for field in self.defaults.fields_for_section(section) {
            fields.insert(field.to_string());
        }

        Ok(fields.into_iter().collect())
    }

    /// A field is hidden when its `X_hidden` override is true or any locale in
    /// its `X_translations_hidden` map is true.
    fn is_field_hidden(&self, section: &str, field: &str) -> Result<bool> {
        if let Some(record) = self
            .db
            .get_content(section, &format!("{}{}", field, HIDDEN_SUFFIX))?
        {
            if parse_hidden_flag(&record.value) {
                return Ok(true);
            }
        }
        if let Some(record) = self
            .db
            .get_content(section, &format!("{}{}", field, TRANSLATIONS_HIDDEN_SUFFIX))?
        {
            if collapse_hidden_map(&record.value) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn is_hidden_metadata_tag(tag: &str) -> bool {
    tag.ends_with(HIDDEN_SUFFIX) || tag.ends_with(TRANSLATIONS_HIDDEN_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DefaultsCatalog;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_resolver() -> (Resolver, Database, TempDir) {
        let temp_dir = TempDir::new().expect("tempdir");
        let db_path = temp_dir.path().join("resolver.db");
        let db = Database::new(db_path.to_str().unwrap()).expect("db");
        let bundles = BundleSet::from_values(vec![
            (
                Locale::ENGLISH,
                json!({
                    "hero": {"title": "Static Welcome", "subtitle": "Static subtitle"},
                    "about": {"bio": "Static bio"}
                }),
            ),
            (
                Locale::SPANISH,
                json!({"hero": {"title": "Bienvenida estática"}}),
            ),
        ])
        .expect("bundles");
        let resolver = Resolver::new(db.clone(), bundles, DefaultsCatalog::new());
        (resolver, db, temp_dir)
    }

    // ==================== resolve Tests ====================

    #[test]
    fn test_resolve_falls_back_to_literal() {
        let (resolver, _db, _tmp) = test_resolver();
        let value = resolver
            .resolve(Locale::FRENCH, "missing.key", "literal")
            .unwrap();
        assert_eq!(value, "literal");
    }

    #[test]
    fn test_resolve_never_empty_when_fallback_given() {
        let (resolver, _db, _tmp) = test_resolver();
        for locale in Locale::all() {
            let value = resolver.resolve(locale, "nothing.here", "fb").unwrap();
            assert_eq!(value, "fb");
        }
    }

    #[test]
    fn test_resolve_bundle_requested_locale() {
        let (resolver, _db, _tmp) = test_resolver();
        let value = resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap();
        assert_eq!(value, "Bienvenida estática");
    }

    #[test]
    fn test_resolve_bundle_source_fallback() {
        let (resolver, _db, _tmp) = test_resolver();
        // Spanish bundle lacks the subtitle: source bundle serves it.
        let value = resolver.resolve(Locale::SPANISH, "hero.subtitle", "").unwrap();
        assert_eq!(value, "Static subtitle");
    }

    #[test]
    fn test_resolve_translation_beats_bundle() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::SPANISH, "Bienvenido guardado".to_string())],
            false,
            false,
        )
        .unwrap();

        let value = resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap();
        assert_eq!(value, "Bienvenido guardado");
    }

    #[test]
    fn test_resolve_translation_source_beats_bundle_target() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::ENGLISH, "Stored Welcome".to_string())],
            false,
            false,
        )
        .unwrap();

        // Stored source text outranks the Spanish bundle entry.
        let value = resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap();
        assert_eq!(value, "Stored Welcome");
    }

    #[test]
    fn test_resolve_override_beats_translation() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::SPANISH, "Traducción".to_string())],
            false,
            false,
        )
        .unwrap();
        db.upsert_content("hero", "title", r#"{"es": "Override es"}"#).unwrap();

        let value = resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap();
        assert_eq!(value, "Override es");
    }

    #[test]
    fn test_empty_override_locale_falls_through() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::FRENCH, "Titre".to_string())],
            false,
            false,
        )
        .unwrap();
        // Override has Spanish only: French must still reach the translation.
        db.upsert_content("hero", "title", r#"{"es": "Override es"}"#).unwrap();

        assert_eq!(resolver.resolve(Locale::FRENCH, "hero.title", "").unwrap(), "Titre");
        assert_eq!(
            resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap(),
            "Override es"
        );
    }

    #[test]
    fn test_scalar_override_counts_for_source_only() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("hero", "title", "Plain English override").unwrap();

        assert_eq!(
            resolver.resolve(Locale::ENGLISH, "hero.title", "").unwrap(),
            "Plain English override"
        );
        // Spanish must not silently mirror the English override.
        assert_eq!(
            resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap(),
            "Bienvenida estática"
        );
    }

    #[test]
    fn test_hidden_override_is_skipped_in_resolve() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("hero", "title", r#"{"es": "Oculto"}"#).unwrap();
        db.upsert_content("hero", "title_hidden", "true").unwrap();

        // Hidden override no longer wins; chain continues below it.
        let value = resolver.resolve(Locale::SPANISH, "hero.title", "").unwrap();
        assert_eq!(value, "Bienvenida estática");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::SPANISH, "Uno".to_string())],
            false,
            false,
        )
        .unwrap();

        let first = resolver.resolve(Locale::SPANISH, "hero.title", "x").unwrap();
        let second = resolver.resolve(Locale::SPANISH, "hero.title", "x").unwrap();
        assert_eq!(first, second);
    }

    // ==================== resolve_section Tests ====================

    #[test]
    fn test_resolve_section_merges_all_sources() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.tagline",
            &[(Locale::ENGLISH, "Stored tagline".to_string())],
            false,
            false,
        )
        .unwrap();
        db.upsert_content("hero", "title", r#"{"en": "Override title"}"#).unwrap();

        let section = resolver.resolve_section(Locale::ENGLISH, "hero").unwrap();
        let obj = section.as_object().unwrap();

        assert_eq!(obj["title"], json!("Override title"));
        assert_eq!(obj["tagline"], json!("Stored tagline"));
        assert_eq!(obj["subtitle"], json!("Static subtitle"));
        assert_eq!(obj["title_hidden"], json!(false));
    }

    #[test]
    fn test_resolve_section_structured_override_served_whole() {
        let (resolver, db, _tmp) = test_resolver();
        let override_value = json!([
            {"id": "rust", "names": {"en": "Rust", "es": "Rust"}, "skills": ["tokio"]}
        ]);
        db.upsert_content("skills", "categories", &override_value.to_string())
            .unwrap();

        let section = resolver.resolve_section(Locale::SPANISH, "skills").unwrap();
        let cats = section["categories"].as_array().unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0]["id"], json!("rust"));
    }

    #[test]
    fn test_resolve_section_synthesizes_defaults() {
        let (resolver, _db, _tmp) = test_resolver();

        let section = resolver.resolve_section(Locale::FRENCH, "skills").unwrap();
        let cats = section["categories"].as_array().unwrap();
        assert_eq!(cats.len(), 3);
        // English populated, French intentionally blank.
        assert_eq!(cats[0]["names"]["en"], json!("Frontend Development"));
        assert_eq!(cats[0]["names"]["fr"], json!(""));
        assert_eq!(section["categories_hidden"], json!(false));
    }

    #[test]
    fn test_resolve_section_hidden_field_masks() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("skills", "categories", r#"[{"id": "x"}]"#).unwrap();
        db.upsert_content(
            "skills",
            "categories_translations_hidden",
            r#"{"en": false, "ja": true}"#,
        )
        .unwrap();

        let section = resolver.resolve_section(Locale::ENGLISH, "skills").unwrap();
        assert_eq!(section["categories"], json!(""));
        assert_eq!(section["categories_hidden"], json!(true));
    }

    #[test]
    fn test_resolve_section_malformed_override_serves_raw_for_source() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("hero", "title", "{broken json").unwrap();

        let section = resolver.resolve_section(Locale::ENGLISH, "hero").unwrap();
        assert_eq!(section["title"], json!("{broken json"));
    }

    #[test]
    fn test_resolve_section_hidden_metadata_not_a_field() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("hero", "title", r#"{"en": "T"}"#).unwrap();
        db.upsert_content("hero", "title_hidden", "false").unwrap();

        let section = resolver.resolve_section(Locale::ENGLISH, "hero").unwrap();
        let obj = section.as_object().unwrap();
        // title_hidden appears once as the collapsed flag, not doubled as a field.
        assert!(obj.contains_key("title_hidden"));
        assert!(!obj.contains_key("title_hidden_hidden"));
    }

    #[test]
    fn test_resolve_section_is_idempotent() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_content("hero", "title", r#"{"en": "T", "es": "E"}"#).unwrap();

        let first = resolver.resolve_section(Locale::SPANISH, "hero").unwrap();
        let second = resolver.resolve_section(Locale::SPANISH, "hero").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_section_unknown_section_is_empty_object() {
        let (resolver, _db, _tmp) = test_resolver();
        let section = resolver.resolve_section(Locale::ENGLISH, "nonexistent").unwrap();
        assert_eq!(section, json!({}));
    }

    #[test]
    fn test_partial_override_other_locales_fall_through_in_section() {
        let (resolver, db, _tmp) = test_resolver();
        db.upsert_translation(
            "hero.title",
            &[(Locale::FRENCH, "Titre stocké".to_string())],
            false,
            false,
        )
        .unwrap();
        db.upsert_content("hero", "title", r#"{"es": "Sólo español"}"#).unwrap();

        let es = resolver.resolve_section(Locale::SPANISH, "hero").unwrap();
        assert_eq!(es["title"], json!("Sólo español"));

        let fr = resolver.resolve_section(Locale::FRENCH, "hero").unwrap();
        assert_eq!(fr["title"], json!("Titre stocké"));
    }
}
