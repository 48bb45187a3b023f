//! Machine translation provider clients.
//!
//! Each provider implements [`TranslationProvider`] so the engine can try
//! them in order without caring which vendor is behind the call. A provider
//! with no API key configured reports itself unavailable instead of erroring
//! at startup.

use crate::config::Config;
use crate::i18n::Locale;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const OPENAI_PROVIDER: &str = "openai";
const DEEPL_PROVIDER: &str = "deepl";

/// Token budget for a single translated field.
const MAX_COMPLETION_TOKENS: u32 = 2000;
const REASONING_MAX_COMPLETION_TOKENS: u32 = 8000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured")]
    NotConfigured { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    Response {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Retry 429 (rate limit), 5xx, and transport-level failures.
    /// Other 4xx errors and missing configuration fail immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::NotConfigured { .. } => false,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Request { .. } => true,
            ProviderError::Response { .. } => true,
        }
    }
}

/// A machine translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this provider can be called at all (key configured).
    fn is_available(&self) -> bool;

    /// Translate source-locale text into `target`. `context` is an optional
    /// caller hint about where the text appears (button label, bio, etc.).
    async fn translate(
        &self,
        text: &str,
        target: Locale,
        context: Option<&str>,
    ) -> Result<String, ProviderError>;
}

// ==================== OpenAI ====================

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the system prompt for translating site copy
fn build_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional translator. Translate the following website copy from English to {}.

## Translation Rules

### DO NOT translate:
- URLs and links
- Proper names of people, companies, and products
- Placeholders in curly braces (e.g., {{name}}, {{year}})
- HTML tags and attributes

### DO translate:
- Headings, labels, and button text
- Descriptive text and explanations

### Formatting:
- Preserve all markdown and HTML formatting
- Preserve all emojis
- Maintain the same structure as the original

### Tone:
- Keep the same register as the original (website copy, concise)
- If a term has no good translation, keep the English term

Return ONLY the translated text with no commentary."#,
        target_language
    )
}

fn build_user_prompt(text: &str, target_language: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!(
            "Translate the following text to {}. Context: {}\n\n{}",
            target_language, context, text
        ),
        None => format!("Translate the following text to {}:\n\n{}", target_language, text),
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_url: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            api_url: config.openai_api_url.clone(),
        }
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        OPENAI_PROVIDER
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(
        &self,
        text: &str,
        target: Locale,
        context: Option<&str>,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured {
            provider: OPENAI_PROVIDER,
        })?;

        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(target.name()),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(text, target.name(), context),
                },
            ],
            max_completion_tokens: if is_reasoning {
                REASONING_MAX_COMPLETION_TOKENS
            } else {
                MAX_COMPLETION_TOKENS
            },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        };

        with_retry_if(
            &RetryConfig::api_call(),
            &format!("OpenAI translation to {}", target.name()),
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Request {
                        provider: OPENAI_PROVIDER,
                        message: e.to_string(),
                    })?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    return Err(ProviderError::Api {
                        provider: OPENAI_PROVIDER,
                        status,
                        body,
                    });
                }

                let chat_response: ChatResponse =
                    response.json().await.map_err(|e| ProviderError::Response {
                        provider: OPENAI_PROVIDER,
                        message: format!("failed to parse response: {}", e),
                    })?;

                let translated = chat_response
                    .choices
                    .first()
                    .map(|c| c.message.content.trim().to_string())
                    .ok_or_else(|| ProviderError::Response {
                        provider: OPENAI_PROVIDER,
                        message: "response contained no choices".to_string(),
                    })?;

                if translated.is_empty() {
                    return Err(ProviderError::Response {
                        provider: OPENAI_PROVIDER,
                        message: "response contained empty text".to_string(),
                    });
                }

                Ok(translated)
            },
            ProviderError::is_retryable,
        )
        .await
    }
}

// ==================== DeepL ====================

#[derive(Debug, Serialize)]
struct DeepLRequest {
    text: Vec<String>,
    source_lang: String,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepL wants uppercase language codes.
fn deepl_lang_code(locale: Locale) -> String {
    locale.code().to_uppercase()
}

pub struct DeepLProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl DeepLProvider {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.deepl_api_key.clone(),
            api_url: config.deepl_api_url.clone(),
        }
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    fn name(&self) -> &'static str {
        DEEPL_PROVIDER
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(
        &self,
        text: &str,
        target: Locale,
        context: Option<&str>,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured {
            provider: DEEPL_PROVIDER,
        })?;

        let request = DeepLRequest {
            text: vec![text.to_string()],
            source_lang: deepl_lang_code(Locale::source()),
            target_lang: deepl_lang_code(target),
            context: context.map(String::from),
        };

        with_retry_if(
            &RetryConfig::api_call(),
            &format!("DeepL translation to {}", target.name()),
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Request {
                        provider: DEEPL_PROVIDER,
                        message: e.to_string(),
                    })?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    return Err(ProviderError::Api {
                        provider: DEEPL_PROVIDER,
                        status,
                        body,
                    });
                }

                let deepl_response: DeepLResponse =
                    response.json().await.map_err(|e| ProviderError::Response {
                        provider: DEEPL_PROVIDER,
                        message: format!("failed to parse response: {}", e),
                    })?;

                let translated = deepl_response
                    .translations
                    .first()
                    .map(|t| t.text.trim().to_string())
                    .ok_or_else(|| ProviderError::Response {
                        provider: DEEPL_PROVIDER,
                        message: "response contained no translations".to_string(),
                    })?;

                if translated.is_empty() {
                    return Err(ProviderError::Response {
                        provider: DEEPL_PROVIDER,
                        message: "response contained empty text".to_string(),
                    });
                }

                Ok(translated)
            },
            ProviderError::is_retryable,
        )
        .await
    }
}
