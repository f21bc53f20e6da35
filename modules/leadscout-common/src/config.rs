use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::LeadScoutError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Bulk listing and contact scraping
    pub apify_api_token: String,

    // Optional discovery backends
    pub serper_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub claude_model: String,

    // History store; in-memory when unset
    pub database_url: Option<String>,

    // Tuning
    pub search_daily_quota: u64,
    pub max_attempts: u32,

    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables. Missing secrets are left
    /// empty and reported by [`Config::validate`].
    pub fn from_env() -> Self {
        Self {
            apify_api_token: env::var("APIFY_API_TOKEN").unwrap_or_default(),
            serper_api_key: optional_env("SERPER_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string()),
            database_url: optional_env("DATABASE_URL"),
            search_daily_quota: parsed_env("SEARCH_DAILY_QUOTA", 100),
            max_attempts: parsed_env("LEADSCOUT_MAX_ATTEMPTS", 10),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }

    /// Fails with [`LeadScoutError::Config`] naming every missing required value.
    pub fn validate(&self) -> Result<(), LeadScoutError> {
        let mut missing = Vec::new();
        if self.apify_api_token.trim().is_empty() {
            missing.push("APIFY_API_TOKEN");
        }
        if self.max_attempts == 0 {
            missing.push("LEADSCOUT_MAX_ATTEMPTS (must be > 0)");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LeadScoutError::Config(format!(
                "missing or invalid: {}",
                missing.join(", ")
            )))
        }
    }

    /// Log which backends are configured without printing secret values.
    pub fn log_redacted(&self) {
        info!(
            apify = !self.apify_api_token.is_empty(),
            serper = self.serper_api_key.is_some(),
            anthropic = self.anthropic_api_key.is_some(),
            postgres = self.database_url.is_some(),
            claude_model = self.claude_model.as_str(),
            search_daily_quota = self.search_daily_quota,
            max_attempts = self.max_attempts,
            data_dir = %self.data_dir.display(),
            "Configuration loaded"
        );
    }

    /// Config for tests and dry runs: every credential set to a placeholder.
    pub fn for_tests() -> Self {
        Self {
            apify_api_token: "test-token".to_string(),
            serper_api_key: None,
            anthropic_api_key: None,
            claude_model: "claude-3-5-haiku-latest".to_string(),
            database_url: None,
            search_daily_quota: 100,
            max_attempts: 10,
            data_dir: env::temp_dir().join("leadscout-tests"),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_apify_token_is_a_config_error() {
        let mut config = Config::for_tests();
        config.apify_api_token = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LeadScoutError::Config(ref msg) if msg.contains("APIFY_API_TOKEN")));
    }

    #[test]
    fn test_config_validates() {
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = Config::for_tests();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
