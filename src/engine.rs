//! Translation engine: ordered provider chain with per-locale fallback.
//!
//! The engine owns the provider list (primary first) and turns one source
//! text into per-locale translations. Provider failures never abort the whole
//! call; each target locale independently falls through the chain, and
//! failures come back as structured errors next to whatever did succeed.

use crate::config::Config;
use crate::i18n::{needs_translation, Locale};
use crate::providers::{DeepLProvider, OpenAiProvider, TranslationProvider};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One provider failure while translating one locale.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationError {
    pub locale: String,
    pub provider: String,
    pub message: String,
}

/// Result of translating one text into a set of target locales.
///
/// A locale missing from `per_locale` means every provider failed for it;
/// the reasons are in `errors`. Both can be non-empty at once.
#[derive(Debug, Default)]
pub struct TranslationOutcome {
    pub per_locale: HashMap<String, String>,
    pub errors: Vec<TranslationError>,
}

impl TranslationOutcome {
    /// True when every requested locale got a translation.
    pub fn is_complete(&self, targets: &[Locale]) -> bool {
        targets.iter().all(|t| self.per_locale.contains_key(t.code()))
    }
}

pub struct TranslationEngine {
    providers: Vec<Box<dyn TranslationProvider>>,
}

impl TranslationEngine {
    pub fn new(providers: Vec<Box<dyn TranslationProvider>>) -> Self {
        Self { providers }
    }

    /// Standard provider chain: OpenAI primary, DeepL fallback.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(vec![
            Box::new(OpenAiProvider::new(client.clone(), config)),
            Box::new(DeepLProvider::new(client, config)),
        ])
    }

    /// Whether at least one provider can be called.
    pub fn is_available(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Translate `text` into each target locale.
    ///
    /// Text with nothing translatable (empty, URL-only, markup-only) passes
    /// through unchanged. When no provider is configured the source text is
    /// echoed for every target so callers still have something to serve, with
    /// errors recording that no translation happened.
    pub async fn translate(
        &self,
        text: &str,
        targets: &[Locale],
        context: Option<&str>,
    ) -> TranslationOutcome {
        let mut outcome = TranslationOutcome::default();

        if !needs_translation(text) {
            debug!("Text has no translatable content, passing through unchanged");
            for target in targets {
                outcome.per_locale.insert(target.code().to_string(), text.to_string());
            }
            return outcome;
        }

        if !self.is_available() {
            warn!("No translation provider configured, echoing source text");
            for target in targets {
                outcome.per_locale.insert(target.code().to_string(), text.to_string());
                outcome.errors.push(TranslationError {
                    locale: target.code().to_string(),
                    provider: "none".to_string(),
                    message: "no translation provider configured, source text used".to_string(),
                });
            }
            return outcome;
        }

        for target in targets {
            let mut translated = None;

            for provider in &self.providers {
                if !provider.is_available() {
                    continue;
                }

                match provider.translate(text, *target, context).await {
                    Ok(result) => {
                        translated = Some(result);
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "Provider {} failed for locale {}: {}",
                            provider.name(),
                            target.code(),
                            e
                        );
                        outcome.errors.push(TranslationError {
                            locale: target.code().to_string(),
                            provider: provider.name().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }

            if let Some(result) = translated {
                outcome.per_locale.insert(target.code().to_string(), result);
            }
        }

        outcome
    }
}
