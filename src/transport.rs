//! The HTTP transport underneath a [`ResilientClient`](crate::ResilientClient).
//!
//! A transport performs exactly one physical attempt. Any HTTP answer, including
//! 4xx and 5xx, is returned as `Ok`, even when its body cannot be read; `Err` means
//! no response was received, or a 2xx body was unreadable.

use crate::{
    error::{ConfigError, TransportError},
    request::ApiRequest,
    response::RawResponse,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Sends a single request attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs one attempt of `request`.
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request).await
    }
}

/// A [`Transport`] backed by `reqwest`.
///
/// Request paths are appended to the base URL's path, so a base of
/// `https://api.coingecko.com/api/v3` and a path of `/simple/price` produce
/// `https://api.coingecko.com/api/v3/simple/price`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self::from_client(http_client, base_url))
    }

    /// Creates a transport that shares an existing `reqwest::Client`.
    pub fn from_client(http_client: reqwest::Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
            timeout: None,
        }
    }

    /// Sets a per-attempt timeout. A timed out attempt counts as a network failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the full URL for a request.
    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        url.set_path(&path);

        if !request.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query_params {
                pairs.append_pair(key, value);
            }
        }

        url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(request);

        let mut builder = self.http_client.request(request.method.clone(), url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) if status.is_success() => {
                return Err(TransportError::Body {
                    status,
                    source: Box::new(err),
                });
            }
            // The status alone decides how an error response is handled.
            Err(err) => {
                tracing::debug!(status = status.as_u16(), error = %err, "Failed to read error response body");
                String::new()
            }
        };

        Ok(RawResponse::new(status, headers, body))
    }
}
