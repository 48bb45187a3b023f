//! Built-in default structured payloads (synthesis templates).
//!
//! When a structured field has no stored override, the resolver synthesizes a
//! default payload from this catalog. English text comes from the bundled
//! defaults; non-English locale entries are left empty on purpose so missing
//! translation work stays visible instead of being papered over with English.

use crate::content::SkillCategory;
use crate::i18n::{Locale, LocaleRegistry};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Catalog of default structured content, keyed by `(section, field)`.
///
/// Injected into the Resolver as its lowest-precedence structured source.
#[derive(Debug, Clone, Default)]
pub struct DefaultsCatalog;

impl DefaultsCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Structured fields this catalog can synthesize for a section.
    pub fn fields_for_section(&self, section: &str) -> Vec<&'static str> {
        match section {
            "skills" => vec!["categories"],
            "services" => vec!["items"],
            _ => vec![],
        }
    }

    /// Synthesize the default payload for `(section, field)`, if one exists.
    pub fn synthesize(&self, section: &str, field: &str) -> Option<Value> {
        match (section, field) {
            ("skills", "categories") => Some(default_skill_categories()),
            ("services", "items") => Some(default_service_items()),
            _ => None,
        }
    }
}

/// Locale-name map with English filled in and every target locale blank.
fn names_with_english(english: &str) -> BTreeMap<String, String> {
    let mut names = BTreeMap::new();
    for config in LocaleRegistry::get().list_enabled() {
        let value = if config.is_source { english } else { "" };
        names.insert(config.code.to_string(), value.to_string());
    }
    names
}

fn default_skill_categories() -> Value {
    let categories = vec![
        SkillCategory {
            id: "frontend".to_string(),
            names: names_with_english("Frontend Development"),
            skills: vec![
                "React".to_string(),
                "TypeScript".to_string(),
                "CSS".to_string(),
            ],
            hidden: false,
        },
        SkillCategory {
            id: "backend".to_string(),
            names: names_with_english("Backend Development"),
            skills: vec![
                "Node.js".to_string(),
                "PostgreSQL".to_string(),
                "REST APIs".to_string(),
            ],
            hidden: false,
        },
        SkillCategory {
            id: "tooling".to_string(),
            names: names_with_english("Tooling & Infrastructure"),
            skills: vec![
                "Docker".to_string(),
                "CI/CD".to_string(),
                "Git".to_string(),
            ],
            hidden: false,
        },
    ];
    serde_json::to_value(categories).unwrap_or(Value::Null)
}

fn default_service_items() -> Value {
    let source = Locale::source().code();
    let mut items = Vec::new();
    for (name, description, icon) in [
        ("Web Development", "Full-stack web applications", "code"),
        ("Consulting", "Architecture and code review", "chat"),
        ("Maintenance", "Ongoing support and upgrades", "wrench"),
    ] {
        let mut name_map = serde_json::Map::new();
        let mut desc_map = serde_json::Map::new();
        for config in LocaleRegistry::get().list_enabled() {
            let (n, d) = if config.code == source {
                (name, description)
            } else {
                ("", "")
            };
            name_map.insert(config.code.to_string(), json!(n));
            desc_map.insert(config.code.to_string(), json!(d));
        }
        items.push(json!({
            "name": name_map,
            "description": desc_map,
            "icon": icon,
            "hidden": false,
        }));
    }
    Value::Array(items)
}
