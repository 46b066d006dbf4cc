//! Example wiring every dashboard provider from the environment.
//!
//! This example shows how to:
//! - Load provider settings from `FOLIO_*` environment variables
//! - Build one resilient client per enabled provider
//! - Show `ApiError` messages to the user as-is
//!
//! Run with: `FOLIO_STOCK_QUOTES_API_KEY=... FOLIO_NEWS_API_KEY=... FOLIO_CHAT_API_KEY=... cargo run --example dashboard_clients`
//!
//! Set `FOLIO_NEWS_ENABLED=false` or `FOLIO_CHAT_ENABLED=false` to skip providers
//! you have no key for.

use folio_api::config::ApiConfig;
use folio_api::providers::{ApiClients, Provider};
use folio_api::rate_limit::RateLimitNotifications;
use folio_api::ApiRequest;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Quote {
    /// Current price
    c: f64,
    /// Previous close
    pc: f64,
}

#[derive(Debug, Deserialize)]
struct Rates {
    base: String,
    rates: std::collections::HashMap<String, f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("folio_api=debug,dashboard_clients=info")
        .init();

    let config = ApiConfig::from_env()?;
    let clients = ApiClients::new(&config, RateLimitNotifications::default())?;

    println!(
        "Enabled providers: {}",
        clients
            .providers()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if let Some(quotes) = clients.client(Provider::StockQuotes) {
        for symbol in ["AAPL", "MSFT", "NVDA"] {
            let request = ApiRequest::get("/quote").with_query_param("symbol", symbol);
            match quotes.call::<Quote>(request).await {
                Ok(quote) => println!(
                    "{:<5} {:>10.2} ({:+.2}), {} attempt(s)",
                    symbol,
                    quote.data.c,
                    quote.data.c - quote.data.pc,
                    quote.attempts
                ),
                Err(err) => println!("{:<5} {}", symbol, err.message),
            }
        }
    }

    if let Some(crypto) = clients.client(Provider::Crypto) {
        let request = ApiRequest::get("/simple/price")
            .with_query_param("ids", "bitcoin,ethereum")
            .with_query_param("vs_currencies", "usd");
        match crypto.call::<serde_json::Value>(request).await {
            Ok(prices) => println!("Crypto: {}", prices.data),
            Err(err) => println!("Crypto: {}", err.message),
        }
    }

    if let Some(fx) = clients.client(Provider::ForexRates) {
        let request = ApiRequest::get("/latest").with_query_param("from", "USD");
        match fx.call::<Rates>(request).await {
            Ok(rates) => {
                let eur = rates.data.rates.get("EUR").copied().unwrap_or_default();
                println!("1 {} = {:.4} EUR", rates.data.base, eur);
            }
            Err(err) => println!("Exchange rates: {}", err.message),
        }
    }

    if let Some(news) = clients.client(Provider::News) {
        let request = ApiRequest::get("/top-headlines")
            .with_query_param("category", "business")
            .with_query_param("pageSize", "3");
        match news.call::<serde_json::Value>(request).await {
            Ok(headlines) => {
                for article in headlines.data["articles"].as_array().into_iter().flatten() {
                    println!("- {}", article["title"].as_str().unwrap_or("(untitled)"));
                }
            }
            Err(err) => println!("News: {}", err.message),
        }
    }

    Ok(())
}
