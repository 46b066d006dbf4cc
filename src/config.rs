//! Configuration for the dashboard's provider clients.
//!
//! Configuration can be deserialized from JSON or assembled from environment
//! variables. Every field has a default, so an empty document is valid and enables
//! all providers with their public base URLs.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `FOLIO_<PROVIDER>_API_KEY` | API key for the provider |
//! | `FOLIO_<PROVIDER>_BASE_URL` | Overrides the provider's base URL |
//! | `FOLIO_<PROVIDER>_ENABLED` | `false` skips building the provider's client |
//! | `FOLIO_API_TIMEOUT_SECS` | Per-attempt timeout; `0` disables it |
//! | `FOLIO_API_MAX_RETRIES` | Retries after the first attempt |
//!
//! `<PROVIDER>` is one of `STOCK_QUOTES`, `CRYPTO`, `NEWS`, `FOREX_RATES`, `CHAT`.

use crate::{error::ConfigError, providers::Provider, retry::DEFAULT_MAX_RETRIES};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Settings for a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Whether a client is built for this provider.
    pub enabled: bool,

    /// Overrides [`Provider::default_base_url`].
    pub base_url: Option<String>,

    /// The provider's API key.
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
        }
    }
}

/// Settings for all provider clients.
///
/// # Examples
///
/// ```
/// use folio_api::{config::ApiConfig, providers::Provider};
///
/// let config = ApiConfig::from_json(r#"{
///     "stock_quotes": { "api_key": "demo" },
///     "chat": { "enabled": false },
///     "timeout_secs": 15
/// }"#).unwrap();
///
/// assert_eq!(config.provider(Provider::StockQuotes).api_key.as_deref(), Some("demo"));
/// assert!(!config.provider(Provider::Chat).enabled);
/// assert_eq!(config.max_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Stock quote provider.
    pub stock_quotes: ProviderConfig,
    /// Crypto price provider.
    pub crypto: ProviderConfig,
    /// Market news provider.
    pub news: ProviderConfig,
    /// FX rate provider.
    pub forex_rates: ProviderConfig,
    /// LLM chat provider.
    pub chat: ProviderConfig,
    /// Per-attempt timeout in seconds; `0` means none.
    pub timeout_secs: Option<u64>,
    /// Retries after the first attempt.
    pub max_retries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            stock_quotes: ProviderConfig::default(),
            crypto: ProviderConfig::default(),
            news: ProviderConfig::default(),
            forex_rates: ProviderConfig::default(),
            chat: ProviderConfig::default(),
            timeout_secs: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Prefix of every environment variable read by [`ApiConfig::from_env`].
pub const ENV_PREFIX: &str = "FOLIO";

impl ApiConfig {
    /// Parses configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for provider in Provider::ALL {
            let prefix = format!("{}_{}", ENV_PREFIX, provider.env_name());
            let settings = config.provider_mut(provider);

            if let Some(key) = non_empty(lookup(&format!("{}_API_KEY", prefix))) {
                settings.api_key = Some(key);
            }
            if let Some(url) = non_empty(lookup(&format!("{}_BASE_URL", prefix))) {
                settings.base_url = Some(url);
            }
            let enabled_key = format!("{}_ENABLED", prefix);
            if let Some(enabled) = parse_var::<bool>(&enabled_key, lookup(&enabled_key))? {
                settings.enabled = enabled;
            }
        }

        let timeout_key = format!("{}_API_TIMEOUT_SECS", ENV_PREFIX);
        if let Some(timeout) = parse_var::<u64>(&timeout_key, lookup(&timeout_key))? {
            config.timeout_secs = Some(timeout);
        }

        let retries_key = format!("{}_API_MAX_RETRIES", ENV_PREFIX);
        if let Some(retries) = parse_var::<usize>(&retries_key, lookup(&retries_key))? {
            config.max_retries = retries;
        }

        tracing::debug!(
            timeout_secs = ?config.timeout_secs,
            max_retries = config.max_retries,
            "Loaded API configuration from environment"
        );

        Ok(config)
    }

    /// Settings for `provider`.
    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::StockQuotes => &self.stock_quotes,
            Provider::Crypto => &self.crypto,
            Provider::News => &self.news,
            Provider::ForexRates => &self.forex_rates,
            Provider::Chat => &self.chat,
        }
    }

    /// Mutable settings for `provider`.
    pub fn provider_mut(&mut self, provider: Provider) -> &mut ProviderConfig {
        match provider {
            Provider::StockQuotes => &mut self.stock_quotes,
            Provider::Crypto => &mut self.crypto,
            Provider::News => &mut self.news,
            Provider::ForexRates => &mut self.forex_rates,
            Provider::Chat => &mut self.chat,
        }
    }

    /// The per-attempt timeout, if configured. Zero means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("{:?}: {}", raw, e),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert!(config.provider(Provider::News).enabled);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_reads_provider_settings() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("FOLIO_STOCK_QUOTES_API_KEY", "quote-key"),
            ("FOLIO_CHAT_API_KEY", "  "),
            ("FOLIO_NEWS_BASE_URL", "http://localhost:9000"),
            ("FOLIO_CRYPTO_ENABLED", "false"),
            ("FOLIO_API_TIMEOUT_SECS", "20"),
            ("FOLIO_API_MAX_RETRIES", "5"),
        ]))
        .unwrap();

        assert_eq!(config.stock_quotes.api_key.as_deref(), Some("quote-key"));
        assert_eq!(config.chat.api_key, None);
        assert_eq!(config.news.base_url.as_deref(), Some("http://localhost:9000"));
        assert!(!config.crypto.enabled);
        assert_eq!(config.timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = ApiConfig::from_lookup(lookup(&[("FOLIO_API_MAX_RETRIES", "many")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "FOLIO_API_MAX_RETRIES"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        let err = ApiConfig::from_lookup(lookup(&[("FOLIO_FOREX_RATES_ENABLED", "nope")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        let config = ApiConfig::from_lookup(lookup(&[("FOLIO_API_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.timeout_secs, Some(0));
        assert_eq!(config.timeout(), None);

        let config = ApiConfig::from_json("{\"timeout_secs\": 0}").unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_from_json_rejects_bad_documents() {
        assert!(matches!(
            ApiConfig::from_json("{\"max_retries\": \"three\"}"),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(ApiConfig::from_json("{}").unwrap(), ApiConfig::default());
    }
}
