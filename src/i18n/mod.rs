//! Internationalization primitives: the locale set, static message bundles,
//! and the gate that decides whether text is worth translating.
//!
//! - `registry`: single source of truth for the supported locale set
//! - `locale`: validated `Locale` value type
//! - `bundle`: compiled per-locale message trees (dot-path key -> string)
//! - `gate`: `needs_translation` predicate

mod bundle;
mod gate;
mod locale;
mod registry;

pub use bundle::BundleSet;
pub use gate::needs_translation;
pub use locale::Locale;
pub use registry::{LocaleConfig, LocaleRegistry};
