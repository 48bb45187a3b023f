//! Localization resolution and auto-translation service for site content.
//!
//! Content for one source locale (English) is layered from three places:
//! admin-authored overrides, stored translations, and static message
//! bundles. The resolver collapses those layers per locale; the pipeline
//! fills the gaps with machine translation through pluggable providers.

pub mod config;
pub mod content;
pub mod db;
pub mod defaults;
pub mod engine;
pub mod i18n;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod retry;
pub mod server;

pub use config::Config;
pub use db::Database;
pub use engine::TranslationEngine;
pub use i18n::{BundleSet, Locale};
pub use pipeline::Pipeline;
pub use resolver::Resolver;
