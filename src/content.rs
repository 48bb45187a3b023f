//! Typed views over stored content values.
//!
//! ContentRecord values arrive as opaque strings written by admin tooling of
//! several vintages: per-locale JSON maps, structured arrays (projects,
//! service items, skill categories), generic key/value objects, or bare
//! scalars. Parsing happens at this boundary; anything that doesn't match a
//! known shape degrades to `Opaque` instead of erroring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Suffix for per-field hidden flags (`title` -> `title_hidden`).
pub const HIDDEN_SUFFIX: &str = "_hidden";

/// Suffix for locale-keyed hidden maps collapsed into one flag.
pub const TRANSLATIONS_HIDDEN_SUFFIX: &str = "_translations_hidden";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillCategory {
    pub id: String,
    /// Per-locale display names; non-source locales may be empty.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// Closed set of shapes a stored content value can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPayload {
    /// `{"en": "...", "es": "..."}` - locale-keyed strings
    LocaleMap(BTreeMap<String, String>),
    Projects(Vec<ProjectContent>),
    Services(Vec<ServiceItem>),
    SkillCategories(Vec<SkillCategory>),
    /// Generic JSON object that is not locale-keyed
    KeyValue(serde_json::Map<String, Value>),
    /// Bare scalar, or anything that failed to parse as a known shape
    Opaque(String),
}

impl ContentPayload {
    /// Parse a raw stored value. Never fails: unknown or malformed input
    /// becomes `Opaque` carrying the raw string.
    pub fn parse(raw: &str) -> ContentPayload {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return ContentPayload::Opaque(raw.to_string()),
        };

        match value {
            Value::String(s) => ContentPayload::Opaque(s),
            Value::Array(_) => {
                if let Ok(cats) = serde_json::from_value::<Vec<SkillCategory>>(value.clone()) {
                    if !cats.is_empty() && cats.iter().all(|c| !c.id.is_empty()) {
                        return ContentPayload::SkillCategories(cats);
                    }
                }
                if let Ok(projects) = serde_json::from_value::<Vec<ProjectContent>>(value.clone()) {
                    if !projects.is_empty() {
                        return ContentPayload::Projects(projects);
                    }
                }
                if let Ok(services) = serde_json::from_value::<Vec<ServiceItem>>(value.clone()) {
                    if !services.is_empty() {
                        return ContentPayload::Services(services);
                    }
                }
                ContentPayload::Opaque(value.to_string())
            }
            Value::Object(map) => {
                if is_locale_map(&map) {
                    let locales = map
                        .into_iter()
                        .filter_map(|(k, v)| match v {
                            Value::String(s) => Some((k, s)),
                            _ => None,
                        })
                        .collect();
                    ContentPayload::LocaleMap(locales)
                } else {
                    ContentPayload::KeyValue(map)
                }
            }
            other => ContentPayload::Opaque(other.to_string()),
        }
    }

    /// The value this payload contributes for one locale, if any.
    ///
    /// A bare scalar counts as source-locale text only: serving it for other
    /// locales would silently mirror English into every language.
    pub fn text_for_locale(&self, locale_code: &str, source_code: &str) -> Option<&str> {
        match self {
            ContentPayload::LocaleMap(map) => {
                map.get(locale_code).map(String::as_str).filter(|s| !s.trim().is_empty())
            }
            ContentPayload::Opaque(s) if locale_code == source_code => {
                Some(s.as_str()).filter(|s| !s.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Structured payloads are served whole (per-locale blanks included).
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ContentPayload::Projects(_)
                | ContentPayload::Services(_)
                | ContentPayload::SkillCategories(_)
                | ContentPayload::KeyValue(_)
        )
    }

    pub fn to_value(&self) -> Value {
        match self {
            ContentPayload::LocaleMap(map) => serde_json::to_value(map).unwrap_or(Value::Null),
            ContentPayload::Projects(p) => serde_json::to_value(p).unwrap_or(Value::Null),
            ContentPayload::Services(s) => serde_json::to_value(s).unwrap_or(Value::Null),
            ContentPayload::SkillCategories(c) => serde_json::to_value(c).unwrap_or(Value::Null),
            ContentPayload::KeyValue(m) => Value::Object(m.clone()),
            ContentPayload::Opaque(s) => Value::String(s.clone()),
        }
    }
}

/// An object is a locale map when every key is a known locale code and every
/// value is a string.
fn is_locale_map(map: &serde_json::Map<String, Value>) -> bool {
    !map.is_empty()
        && map.iter().all(|(k, v)| {
            crate::i18n::LocaleRegistry::get().get_by_code(k).is_some() && v.is_string()
        })
}

/// Collapse a `X_translations_hidden` locale map into one flag: hidden when
/// any locale marks it hidden.
pub fn collapse_hidden_map(raw: &str) -> bool {
    match serde_json::from_str::<BTreeMap<String, Value>>(raw) {
        Ok(map) => map.values().any(|v| v.as_bool().unwrap_or(false)),
        Err(_) => false,
    }
}

/// Parse a stored per-field hidden flag (`"true"`, `true`, `1`).
pub fn parse_hidden_flag(raw: &str) -> bool {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Bool(b)) => b,
        Ok(Value::Number(n)) => n.as_i64() == Some(1),
        Ok(Value::String(s)) => s == "true" || s == "1",
        _ => raw.trim() == "true" || raw.trim() == "1",
    }
}
