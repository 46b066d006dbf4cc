//! Provider clients built from configuration, pointed at a mock server.

use folio_api::config::ApiConfig;
use folio_api::providers::{ApiClients, Provider};
use folio_api::rate_limit::RateLimitNotifications;
use folio_api::{ApiRequest, RATE_LIMITED_MESSAGE};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::RecordingNotifier;

fn config_for(server: &MockServer) -> ApiConfig {
    let mut config = ApiConfig::default();
    for provider in Provider::ALL {
        config.provider_mut(provider).base_url = Some(server.uri());
    }
    config.stock_quotes.api_key = Some("quote-key".into());
    config.news.api_key = Some("news-key".into());
    config.chat.api_key = Some("chat-key".into());
    config.max_retries = 0;
    config
}

#[tokio::test]
async fn test_query_param_key_is_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "AAPL"))
        .and(query_param("token", "quote-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"c": 189.5})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let clients = ApiClients::new(&config_for(&mock_server), RateLimitNotifications::default())
        .unwrap();
    let quotes = clients.client(Provider::StockQuotes).unwrap();

    let response = quotes
        .call::<serde_json::Value>(ApiRequest::get("/quote").with_query_param("symbol", "AAPL"))
        .await
        .unwrap();

    assert_eq!(response.data["c"], 189.5);
}

#[tokio::test]
async fn test_header_keys_are_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/top-headlines"))
        .and(header("x-api-key", "news-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"articles": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer chat-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let clients = ApiClients::new(&config_for(&mock_server), RateLimitNotifications::default())
        .unwrap();

    clients
        .client(Provider::News)
        .unwrap()
        .get::<serde_json::Value>("/top-headlines")
        .await
        .unwrap();

    clients
        .client(Provider::Chat)
        .unwrap()
        .post::<_, serde_json::Value>(
            "/chat/completions",
            &serde_json::json!({"messages": [{"role": "user", "content": "How is my portfolio?"}]}),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_keyless_provider_sends_no_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(move |req: &wiremock::Request| {
            if req.url.query_pairs().any(|(k, _)| k == "apikey") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"rates": {"EUR": 0.92}}))
            }
        })
        .mount(&mock_server)
        .await;

    let clients = ApiClients::new(&config_for(&mock_server), RateLimitNotifications::default())
        .unwrap();

    let rates = clients
        .client(Provider::ForexRates)
        .unwrap()
        .get::<serde_json::Value>("/latest")
        .await
        .unwrap();

    assert_eq!(rates.data["rates"]["EUR"], 0.92);
}

#[tokio::test]
async fn test_rate_limit_warning_is_shared_between_providers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .mount(&mock_server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let notifications = RateLimitNotifications::builder()
        .notifier(notifier.clone())
        .build();
    let clients = ApiClients::new(&config_for(&mock_server), notifications).unwrap();

    let crypto = clients.client(Provider::Crypto).unwrap();
    let news = clients.client(Provider::News).unwrap();

    let (a, b) = tokio::join!(
        crypto.get::<serde_json::Value>("/simple/price"),
        news.get::<serde_json::Value>("/everything"),
    );

    assert_eq!(a.unwrap_err().message, RATE_LIMITED_MESSAGE);
    assert_eq!(b.unwrap_err().message, RATE_LIMITED_MESSAGE);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_configured_timeout_applies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = config_for(&mock_server);
    config.timeout_secs = Some(1);
    let clients = ApiClients::new(&config, RateLimitNotifications::default()).unwrap();

    let err = clients
        .client(Provider::ForexRates)
        .unwrap()
        .get::<serde_json::Value>("/latest")
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.attempts, 1);
}
