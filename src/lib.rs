//! # folio-api - resilient third-party API clients
//!
//! The portfolio dashboard gets quotes, crypto prices, news, exchange rates and
//! assistant replies from third-party REST APIs. Every one of those calls goes
//! through a [`ResilientClient`], which:
//!
//! - retries 429, 5xx and network failures up to 3 times with capped exponential
//!   backoff, honouring `Retry-After` when the provider sends it;
//! - fails any other 4xx, or an aborted request, immediately;
//! - warns the user about rate limiting at most once every 10 seconds across all
//!   providers;
//! - returns exactly one error type, [`ApiError`], whose message can be shown as-is.
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio_api::{config::ApiConfig, providers::{ApiClients, Provider}, ApiRequest};
//! use folio_api::rate_limit::RateLimitNotifications;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Quote {
//!     /// Current price
//!     c: f64,
//!     /// Previous close
//!     pc: f64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One cooldown shared by every provider client
//!     let notifications = RateLimitNotifications::default();
//!     let clients = ApiClients::new(&ApiConfig::from_env()?, notifications)?;
//!
//!     let quotes = clients
//!         .client(Provider::StockQuotes)
//!         .ok_or("stock quotes disabled")?;
//!
//!     let request = ApiRequest::get("/quote").with_query_param("symbol", "AAPL");
//!     match quotes.call::<Quote>(request).await {
//!         Ok(quote) => println!("AAPL {:.2} ({:+.2})", quote.data.c, quote.data.c - quote.data.pc),
//!         Err(err) => eprintln!("{}", err.message),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom transports
//!
//! Anything implementing [`Transport`] can be wrapped, which is how the tests
//! script failures without a network:
//!
//! ```
//! use async_trait::async_trait;
//! use folio_api::{ApiRequest, RawResponse, Transport, TransportError};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl Transport for Offline {
//!     async fn send(&self, _request: &ApiRequest) -> Result<RawResponse, TransportError> {
//!         Err(TransportError::Aborted)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let client = folio_api::ResilientClient::builder(Offline).build();
//! let err = client.send(ApiRequest::get("/quote")).await.unwrap_err();
//! assert_eq!(err.attempts, 1);
//! # }
//! ```

pub mod classify;
mod client;
pub mod clock;
pub mod config;
mod error;
pub mod providers;
pub mod rate_limit;
mod request;
mod response;
pub mod retry;
mod transport;

pub use client::{apply_resilience, ResilientClient, ResilientClientBuilder, DEFAULT_LABEL};
pub use error::{
    ApiError, BoxError, ConfigError, Result, TransportError, CLIENT_MESSAGE, FALLBACK_MESSAGE,
    NETWORK_MESSAGE, RATE_LIMITED_MESSAGE, SERVICE_MESSAGE,
};
pub use request::ApiRequest;
pub use response::{RawResponse, Response};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};
