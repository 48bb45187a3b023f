use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,

    // OpenAI (primary translation provider)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // DeepL (fallback translation provider)
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,

    // Pipeline
    pub batch_size: u32,
    pub max_job_attempts: u32,
    pub job_timeout_secs: u64,

    // Outbound HTTP
    pub http_timeout_secs: u64,

    // Storage & static bundles
    pub database_path: String,
    pub locales_dir: String,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            // Providers are optional: the engine reports itself unavailable
            // when no key is configured, it is not a startup error.
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),

            deepl_api_key: std::env::var("DEEPL_API_KEY").ok().filter(|k| !k.is_empty()),
            deepl_api_url: std::env::var("DEEPL_API_URL")
                .unwrap_or_else(|_| "https://api-free.deepl.com/v2/translate".to_string()),

            batch_size: std::env::var("TRANSLATION_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            max_job_attempts: std::env::var("TRANSLATION_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            job_timeout_secs: std::env::var("TRANSLATION_JOB_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/content.db".to_string()),
            locales_dir: std::env::var("LOCALES_DIR").unwrap_or_else(|_| "data/locales".to_string()),

            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }

    /// Build the shared outbound HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }
}

#[cfg(test)]
impl Config {
    /// Config with no providers configured, pointing at a test database.
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: "http://localhost:0/v1/chat/completions".to_string(),
            deepl_api_key: None,
            deepl_api_url: "http://localhost:0/v2/translate".to_string(),
            batch_size: 50,
            max_job_attempts: 3,
            job_timeout_secs: 5,
            http_timeout_secs: 5,
            database_path: ":memory:".to_string(),
            locales_dir: "data/locales".to_string(),
            port: 8080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tests_has_no_providers() {
        let config = Config::for_tests();
        assert!(config.openai_api_key.is_none());
        assert!(config.deepl_api_key.is_none());
    }

    #[test]
    fn test_for_tests_defaults() {
        let config = Config::for_tests();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_job_attempts, 3);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_http_client_builds() {
        let config = Config::for_tests();
        assert!(config.http_client().is_ok());
    }
}
