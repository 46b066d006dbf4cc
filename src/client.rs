//! The resilient client: classification, bounded retries and error normalization.
//!
//! [`ResilientClient`] wraps a [`Transport`]. Each logical request runs through an
//! explicit retry loop:
//!
//! 1. send the request;
//! 2. on a 2xx answer, return it;
//! 3. otherwise classify the failure, warn the user on 429 (subject to cooldown),
//!    and either wait and resend the identical request or give up with an
//!    [`ApiError`].

use crate::{
    classify::{Failure, FailureClass},
    error::{ApiError, ConfigError},
    rate_limit::{parse_retry_after, RateLimitNotifications},
    request::{parse_header, ApiRequest},
    response::{RawResponse, Response},
    retry::RetryPolicy,
    transport::Transport,
    Result,
};
use http::{HeaderMap, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Label used when none is given.
pub const DEFAULT_LABEL: &str = "API";

/// Wraps `transport` so that its failures are retried and normalized.
///
/// `label` names the API in logs and in rate limit warnings. Every client that
/// should share the warning cooldown must receive a clone of the same
/// `notifications`. Wrapping the same transport twice yields two independent
/// clients, each with its own retry budget per request.
///
/// # Examples
///
/// ```no_run
/// use folio_api::{apply_resilience, rate_limit::RateLimitNotifications, ReqwestTransport};
///
/// # fn example() -> Result<(), folio_api::ConfigError> {
/// let notifications = RateLimitNotifications::default();
/// let quotes = apply_resilience(
///     ReqwestTransport::new("https://finnhub.io/api/v1")?,
///     Some("Stock quotes"),
///     &notifications,
/// );
/// let news = apply_resilience(
///     ReqwestTransport::new("https://newsapi.org/v2")?,
///     Some("Market news"),
///     &notifications,
/// );
/// # let _ = (quotes, news);
/// # Ok(())
/// # }
/// ```
pub fn apply_resilience<T: Transport>(
    transport: T,
    label: Option<&str>,
    notifications: &RateLimitNotifications,
) -> ResilientClient {
    let mut builder = ResilientClient::builder(transport).notifications(notifications.clone());
    if let Some(label) = label {
        builder = builder.label(label);
    }
    builder.build()
}

/// A client whose requests are retried on transient failures and that only ever
/// fails with [`ApiError`].
///
/// Cheap to clone; clones share configuration and the underlying transport.
///
/// # Examples
///
/// ```no_run
/// use folio_api::{ResilientClient, ReqwestTransport, RetryPolicy};
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Rates {
///     rates: std::collections::HashMap<String, f64>,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new("https://api.frankfurter.app")?
///     .with_timeout(Duration::from_secs(10));
///
/// let client = ResilientClient::builder(transport)
///     .label("Exchange rates")
///     .retry_policy(RetryPolicy::default())
///     .build();
///
/// let latest = client.get::<Rates>("/latest").await?;
/// println!("EUR/USD: {:?}", latest.data.rates.get("USD"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    label: String,
    default_headers: HeaderMap,
    default_query_params: Vec<(String, String)>,
    retry_policy: RetryPolicy,
    notifications: RateLimitNotifications,
}

/// A request that eventually succeeded.
struct Completed {
    response: RawResponse,
    attempts: usize,
    latency: Duration,
}

impl ResilientClient {
    /// Creates a new builder around `transport`.
    pub fn builder<T: Transport>(transport: T) -> ResilientClientBuilder {
        ResilientClientBuilder::new(Arc::new(transport))
    }

    /// The label naming this API.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The retry policy in effect.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Sends a request and returns the raw response on success.
    ///
    /// On success the response is exactly what the transport returned.
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        self.execute(request).await.map(|completed| completed.response)
    }

    /// Sends a request and decodes the JSON response body.
    ///
    /// A 2xx answer whose body does not decode as `Res` fails with the generic
    /// message; the status is kept.
    pub async fn call<Res>(&self, request: ApiRequest) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let Completed {
            response,
            attempts,
            latency,
        } = self.execute(request).await?;

        match serde_json::from_str::<Res>(&response.body) {
            Ok(data) => Ok(Response::new(
                data,
                response.body,
                response.status,
                response.headers,
                latency,
                attempts,
            )),
            Err(e) => {
                tracing::error!(
                    api = %self.inner.label,
                    status = response.status.as_u16(),
                    error = %e,
                    raw_response = %response.body,
                    "Failed to deserialize response"
                );
                Err(ApiError::fallback(Some(response.status), attempts))
            }
        }
    }

    /// Makes a GET request to the specified path.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(ApiRequest::new(Method::GET, path)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = self.with_body(ApiRequest::new(Method::POST, path), body)?;
        self.call(request).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = self.with_body(ApiRequest::new(Method::PUT, path), body)?;
        self.call(request).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = self.with_body(ApiRequest::new(Method::PATCH, path), body)?;
        self.call(request).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(ApiRequest::new(Method::DELETE, path)).await
    }

    fn with_body<Req>(&self, request: ApiRequest, body: &Req) -> Result<ApiRequest>
    where
        Req: Serialize + ?Sized,
    {
        request.with_json(body).map_err(|e| {
            tracing::error!(api = %self.inner.label, error = %e, "Failed to serialize request");
            ApiError::fallback(None, 0)
        })
    }

    /// Applies client-wide headers and query parameters.
    ///
    /// Headers set on the request win over defaults.
    fn prepare(&self, mut request: ApiRequest) -> ApiRequest {
        for (name, value) in &self.inner.default_headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }

        if !self.inner.default_query_params.is_empty() {
            let mut query_params = self.inner.default_query_params.clone();
            query_params.append(&mut request.query_params);
            request.query_params = query_params;
        }

        request
    }

    /// Runs the retry loop for one logical request.
    async fn execute(&self, request: ApiRequest) -> Result<Completed> {
        let request = self.prepare(request);
        let label = self.inner.label.as_str();
        let start_time = Instant::now();
        let mut retry_count = 0;

        loop {
            let attempt = retry_count + 1;

            tracing::debug!(
                api = %label,
                method = %request.method,
                path = %request.path,
                attempt = attempt,
                "Executing HTTP request"
            );

            let failure = match self.inner.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    let latency = start_time.elapsed();
                    tracing::info!(
                        api = %label,
                        status = response.status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt,
                        "Received HTTP response"
                    );
                    return Ok(Completed {
                        response,
                        attempts: attempt,
                        latency,
                    });
                }
                Ok(response) => Failure::Response(response),
                Err(e) => Failure::Transport(e),
            };

            let class = failure.classify();
            tracing::warn!(
                api = %label,
                error = %failure,
                class = ?class,
                attempt = attempt,
                method = %request.method,
                path = %request.path,
                "Request failed"
            );

            if class == FailureClass::RateLimited {
                self.inner.notifications.notify(label);
            }

            retry_count += 1;
            let retry_after = failure
                .headers()
                .and_then(|headers| parse_retry_after(headers, self.inner.notifications.clock().now()));

            match self.inner.retry_policy.delay(class, retry_count, retry_after) {
                Some(delay) => {
                    tracing::info!(
                        api = %label,
                        delay_ms = delay.as_millis(),
                        retry = retry_count,
                        from_retry_after = retry_after.is_some(),
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let error = ApiError::from_failure(&failure, attempt);
                    tracing::error!(
                        api = %label,
                        status = ?error.status,
                        attempts = attempt,
                        retryable = class.is_retryable(),
                        "Giving up on request"
                    );
                    return Err(error);
                }
            }
        }
    }
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("label", &self.inner.label)
            .field("retry_policy", &self.inner.retry_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating a [`ResilientClient`].
pub struct ResilientClientBuilder {
    transport: Arc<dyn Transport>,
    label: Option<String>,
    default_headers: HeaderMap,
    default_query_params: Vec<(String, String)>,
    retry_policy: RetryPolicy,
    notifications: Option<RateLimitNotifications>,
}

impl ResilientClientBuilder {
    /// Creates a builder around a shared transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            label: None,
            default_headers: HeaderMap::new(),
            default_query_params: Vec::new(),
            retry_policy: RetryPolicy::default(),
            notifications: None,
        }
    }

    /// Sets the label naming this API in logs and warnings.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter sent ahead of every request's own parameters.
    pub fn default_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query_params.push((key.into(), value.into()));
        self
    }

    /// Sets the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the shared rate limit notifications.
    ///
    /// Without this the client gets a private cooldown using the system clock.
    pub fn notifications(mut self, notifications: RateLimitNotifications) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Builds the configured `ResilientClient`.
    pub fn build(self) -> ResilientClient {
        ResilientClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                label: self.label.unwrap_or_else(|| DEFAULT_LABEL.to_string()),
                default_headers: self.default_headers,
                default_query_params: self.default_query_params,
                retry_policy: self.retry_policy,
                notifications: self.notifications.unwrap_or_default(),
            }),
        }
    }
}
