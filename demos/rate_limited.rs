//! Example demonstrating retries and the shared rate limit warning offline.
//!
//! This example shows how to:
//! - Wrap a custom `Transport` with `apply_resilience`
//! - Watch 429 and 5xx responses being retried with backoff
//! - See one rate limit warning shared by several clients
//!
//! Run with: `cargo run --example rate_limited`

use async_trait::async_trait;
use folio_api::rate_limit::{Notifier, RateLimitNotifications};
use folio_api::{apply_resilience, ApiRequest, RawResponse, Transport, TransportError};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Answers `status` for the first `failures` attempts, then 200.
struct Flaky {
    status: StatusCode,
    failures: usize,
    calls: AtomicUsize,
}

impl Flaky {
    fn new(status: u16, failures: usize) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transport for Flaky {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        println!("  -> {} {} (attempt {})", request.method, request.path, call + 1);

        if call < self.failures {
            let mut headers = HeaderMap::new();
            if self.status == StatusCode::TOO_MANY_REQUESTS {
                headers.insert("retry-after", HeaderValue::from_static("1"));
            }
            return Ok(RawResponse::new(self.status, headers, String::new()));
        }

        Ok(RawResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            r#"{"price": 101.25}"#.to_string(),
        ))
    }
}

/// Prints warnings the way a dashboard toast would show them.
struct Console;

impl Notifier for Console {
    fn warn(&self, api: &str, message: &str) {
        println!("  [toast] {}: {}", api, message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("folio_api=info")
        .init();

    let notifications = RateLimitNotifications::new(Arc::new(Console));

    println!("=== Example 1: Rate limited twice, Retry-After: 1 ===");
    let quotes = apply_resilience(Flaky::new(429, 2), Some("Stock quotes"), &notifications);
    let start = Instant::now();
    let quote = quotes
        .call::<serde_json::Value>(ApiRequest::get("/quote"))
        .await?;
    println!(
        "Got {} after {} attempts in {:?}\n",
        quote.data,
        quote.attempts,
        start.elapsed()
    );

    println!("=== Example 2: A second provider is rate limited inside the cooldown ===");
    let crypto = apply_resilience(Flaky::new(429, 1), Some("Crypto prices"), &notifications);
    crypto
        .call::<serde_json::Value>(ApiRequest::get("/simple/price"))
        .await?;
    println!("No second toast was shown\n");

    println!("=== Example 3: Server errors back off 500ms, then 1s ===");
    let news = apply_resilience(Flaky::new(503, 2), Some("Market news"), &notifications);
    let start = Instant::now();
    news.send(ApiRequest::get("/top-headlines")).await?;
    println!("Recovered in {:?}\n", start.elapsed());

    println!("=== Example 4: The retry budget runs out ===");
    let chat = apply_resilience(Flaky::new(500, usize::MAX), Some("Portfolio assistant"), &notifications);
    match chat.send(ApiRequest::post("/chat/completions")).await {
        Ok(_) => println!("Unexpected success"),
        Err(err) => println!("Shown to the user: {} ({} attempts)", err.message, err.attempts),
    }

    Ok(())
}
