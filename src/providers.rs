//! The third-party APIs behind the dashboard and the composition root that wires
//! one resilient client per provider.

use crate::{
    client::ResilientClient,
    config::{ApiConfig, ProviderConfig},
    error::ConfigError,
    rate_limit::RateLimitNotifications,
    retry::RetryPolicy,
    transport::ReqwestTransport,
};
use std::collections::HashMap;
use std::fmt;

/// A data source used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Stock quotes and candles.
    StockQuotes,
    /// Crypto prices.
    Crypto,
    /// Market news.
    News,
    /// Currency exchange rates.
    ForexRates,
    /// LLM-backed portfolio assistant.
    Chat,
}

/// Where a provider expects its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    /// As a query parameter with the given name.
    QueryParam(&'static str),
    /// As a header, with the value prefixed by `prefix`.
    Header {
        /// Header name.
        name: &'static str,
        /// Text placed before the key, such as `"Bearer "`.
        prefix: &'static str,
    },
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 5] = [
        Provider::StockQuotes,
        Provider::Crypto,
        Provider::News,
        Provider::ForexRates,
        Provider::Chat,
    ];

    /// Human-readable name shown in warnings.
    pub fn label(self) -> &'static str {
        match self {
            Provider::StockQuotes => "Stock quotes",
            Provider::Crypto => "Crypto prices",
            Provider::News => "Market news",
            Provider::ForexRates => "Exchange rates",
            Provider::Chat => "Portfolio assistant",
        }
    }

    /// Public base URL used unless configuration overrides it.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::StockQuotes => "https://finnhub.io/api/v1",
            Provider::Crypto => "https://api.coingecko.com/api/v3",
            Provider::News => "https://newsapi.org/v2",
            Provider::ForexRates => "https://api.frankfurter.app",
            Provider::Chat => "https://api.openai.com/v1",
        }
    }

    /// Upper-case name used in environment variables.
    pub fn env_name(self) -> &'static str {
        match self {
            Provider::StockQuotes => "STOCK_QUOTES",
            Provider::Crypto => "CRYPTO",
            Provider::News => "NEWS",
            Provider::ForexRates => "FOREX_RATES",
            Provider::Chat => "CHAT",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::StockQuotes => "FOLIO_STOCK_QUOTES_API_KEY",
            Provider::Crypto => "FOLIO_CRYPTO_API_KEY",
            Provider::News => "FOLIO_NEWS_API_KEY",
            Provider::ForexRates => "FOLIO_FOREX_RATES_API_KEY",
            Provider::Chat => "FOLIO_CHAT_API_KEY",
        }
    }

    /// How the API key is attached to requests.
    pub fn key_placement(self) -> KeyPlacement {
        match self {
            Provider::StockQuotes => KeyPlacement::QueryParam("token"),
            Provider::Crypto => KeyPlacement::Header {
                name: "x-cg-demo-api-key",
                prefix: "",
            },
            Provider::News => KeyPlacement::Header {
                name: "x-api-key",
                prefix: "",
            },
            Provider::ForexRates => KeyPlacement::QueryParam("apikey"),
            Provider::Chat => KeyPlacement::Header {
                name: "authorization",
                prefix: "Bearer ",
            },
        }
    }

    /// Whether requests fail without a key.
    ///
    /// Keyless providers still attach a key when one is configured.
    pub fn requires_key(self) -> bool {
        matches!(
            self,
            Provider::StockQuotes | Provider::News | Provider::Chat
        )
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One resilient client per enabled provider, all sharing a rate limit cooldown.
///
/// # Examples
///
/// ```no_run
/// use folio_api::{config::ApiConfig, providers::{ApiClients, Provider}, ApiRequest};
/// use folio_api::rate_limit::RateLimitNotifications;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ApiConfig::from_env()?;
/// let clients = ApiClients::new(&config, RateLimitNotifications::default())?;
///
/// if let Some(quotes) = clients.client(Provider::StockQuotes) {
///     let request = ApiRequest::get("/quote").with_query_param("symbol", "NVDA");
///     let quote = quotes.call::<serde_json::Value>(request).await?;
///     println!("{}", quote.data);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ApiClients {
    clients: HashMap<Provider, ResilientClient>,
    notifications: RateLimitNotifications,
}

impl ApiClients {
    /// Builds a client for every enabled provider in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an enabled provider that requires a key has none, or if
    /// a base URL or key cannot be used.
    pub fn new(
        config: &ApiConfig,
        notifications: RateLimitNotifications,
    ) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        let retry_policy = RetryPolicy::default().with_max_retries(config.max_retries);

        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            let settings = config.provider(provider);
            if !settings.enabled {
                tracing::debug!(provider = %provider, "Provider disabled, skipping");
                continue;
            }

            let client = build_client(
                provider,
                settings,
                config,
                http_client.clone(),
                retry_policy.clone(),
                &notifications,
            )?;
            clients.insert(provider, client);
        }

        tracing::info!(providers = clients.len(), "Built provider API clients");

        Ok(Self {
            clients,
            notifications,
        })
    }

    /// The client for `provider`, if it is enabled.
    pub fn client(&self, provider: Provider) -> Option<&ResilientClient> {
        self.clients.get(&provider)
    }

    /// The shared rate limit cooldown.
    pub fn notifications(&self) -> &RateLimitNotifications {
        &self.notifications
    }

    /// Enabled providers.
    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.clients.contains_key(provider))
    }
}

fn build_client(
    provider: Provider,
    settings: &ProviderConfig,
    config: &ApiConfig,
    http_client: reqwest::Client,
    retry_policy: RetryPolicy,
    notifications: &RateLimitNotifications,
) -> Result<ResilientClient, ConfigError> {
    let base_url = settings
        .base_url
        .as_deref()
        .unwrap_or_else(|| provider.default_base_url());
    let mut transport = ReqwestTransport::from_client(http_client, url::Url::parse(base_url)?);
    if let Some(timeout) = config.timeout() {
        transport = transport.with_timeout(timeout);
    }

    let mut builder = ResilientClient::builder(transport)
        .label(provider.label())
        .retry_policy(retry_policy)
        .notifications(notifications.clone());

    match (settings.api_key.as_deref(), provider.key_placement()) {
        (Some(key), KeyPlacement::QueryParam(name)) => {
            builder = builder.default_query_param(name, key);
        }
        (Some(key), KeyPlacement::Header { name, prefix }) => {
            builder = builder.default_header(name, format!("{}{}", prefix, key))?;
        }
        (None, _) if provider.requires_key() => {
            return Err(ConfigError::MissingApiKey {
                provider: provider.label(),
                env_var: provider.api_key_env(),
            });
        }
        (None, _) => {}
    }

    tracing::debug!(provider = %provider, base_url = %base_url, "Configured provider client");
    Ok(builder.build())
}
