//! Error types for provider API calls.
//!
//! Every request that fails returns exactly one type, [`ApiError`], whose message is
//! safe to show to a user as-is. Transport-level detail is kept in [`TransportError`],
//! which only ever travels between a [`Transport`](crate::Transport) and the client.
//! Problems building clients or loading configuration are reported as [`ConfigError`].

use crate::classify::Failure;
use http::StatusCode;

/// Shown when no response was received at all.
pub const NETWORK_MESSAGE: &str = "Network error. Check your connection and try again.";

/// Shown when the provider keeps answering 429.
pub const RATE_LIMITED_MESSAGE: &str = "We're getting rate limited. Please try again in a moment.";

/// Shown for 5xx responses.
pub const SERVICE_MESSAGE: &str = "The service is having trouble right now. Please try again soon.";

/// Shown for 4xx responses other than 429.
pub const CLIENT_MESSAGE: &str = "We couldn't complete that request. Please check your input.";

/// Shown when nothing more specific applies.
pub const FALLBACK_MESSAGE: &str = "We couldn't complete that request. Please try again.";

/// The single error type returned by a [`ResilientClient`](crate::ResilientClient).
///
/// The message is already generic and user-facing; raw transport text never ends up
/// here. `status` is set whenever an HTTP response was received.
///
/// # Examples
///
/// ```no_run
/// use folio_api::{ApiRequest, ResilientClient, ReqwestTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ResilientClient::builder(ReqwestTransport::new("https://api.example.com")?)
///     .label("Quotes")
///     .build();
///
/// match client.get::<serde_json::Value>("/quote").await {
///     Ok(response) => println!("{:?}", response.data),
///     Err(err) if err.is_network() => eprintln!("offline: {}", err),
///     Err(err) => eprintln!("{} (status {:?})", err.message, err.status),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    /// User-facing description of the failure.
    pub message: String,

    /// The HTTP status code, absent when no response was received.
    pub status: Option<StatusCode>,

    /// Number of physical attempts made before giving up.
    pub attempts: usize,
}

impl ApiError {
    /// Creates an error with an explicit message.
    pub fn new(message: impl Into<String>, status: Option<StatusCode>, attempts: usize) -> Self {
        Self {
            message: message.into(),
            status,
            attempts,
        }
    }

    /// Normalizes the final failed attempt of a request.
    ///
    /// The first matching rule wins: no response, 429, 5xx, 4xx, anything else.
    pub(crate) fn from_failure(failure: &Failure, attempts: usize) -> Self {
        let status = failure.status();
        let message = if failure.is_network() {
            NETWORK_MESSAGE
        } else {
            match status {
                Some(StatusCode::TOO_MANY_REQUESTS) => RATE_LIMITED_MESSAGE,
                Some(s) if s.as_u16() >= 500 => SERVICE_MESSAGE,
                Some(s) if s.is_client_error() => CLIENT_MESSAGE,
                _ => FALLBACK_MESSAGE,
            }
        };

        Self::new(message, status, attempts)
    }

    /// A request that failed without a classifiable cause, such as an undecodable body.
    pub(crate) fn fallback(status: Option<StatusCode>, attempts: usize) -> Self {
        Self::new(FALLBACK_MESSAGE, status, attempts)
    }

    /// Returns `true` if no response was received.
    pub fn is_network(&self) -> bool {
        self.status.is_none() && self.message == NETWORK_MESSAGE
    }

    /// Returns `true` if the provider rate limited the request.
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Boxed error used to carry the underlying cause of a network failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why an attempt produced no usable HTTP response.
///
/// Transports return this for failures below the HTTP layer. A response with an
/// error status is not a `TransportError`; it is returned as a normal response and
/// classified by the client.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, TLS failure, and similar.
    #[error("Network error: {0}")]
    Network(#[source] BoxError),

    /// The attempt timed out before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The caller explicitly cancelled the attempt.
    #[error("Request aborted")]
    Aborted,

    /// The request could not be turned into a valid HTTP request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx response arrived but its body could not be read.
    #[error("Failed to read response body (HTTP {status}): {source}")]
    Body {
        /// The status that was received.
        status: StatusCode,
        /// Why reading the body failed.
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    /// Wraps any error as a network failure.
    pub fn network(err: impl Into<BoxError>) -> Self {
        TransportError::Network(err.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(Box::new(err))
        }
    }
}

/// Errors raised while building clients or loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An invalid base URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be parsed.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// An enabled provider requires an API key and none was configured.
    #[error("Missing API key for {provider}: set {env_var}")]
    MissingApiKey {
        /// Label of the provider.
        provider: &'static str,
        /// Environment variable that supplies the key.
        env_var: &'static str,
    },

    /// A configuration value was present but unusable.
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue {
        /// The offending key or variable name.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The underlying HTTP client could not be created.
    #[error("Failed to build HTTP transport: {0}")]
    Transport(String),
}

/// A specialized `Result` type for provider API calls.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::RawResponse;
    use http::HeaderMap;

    fn response_failure(status: u16) -> Failure {
        Failure::Response(RawResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            String::from("raw upstream text"),
        ))
    }

    #[test]
    fn test_network_failures_use_network_message() {
        let err = ApiError::from_failure(
            &Failure::Transport(TransportError::network(std::io::Error::other("refused"))),
            4,
        );
        assert_eq!(err.message, NETWORK_MESSAGE);
        assert_eq!(err.status, None);
        assert_eq!(err.attempts, 4);
        assert!(err.is_network());

        let err = ApiError::from_failure(&Failure::Transport(TransportError::Timeout), 1);
        assert_eq!(err.message, NETWORK_MESSAGE);
    }

    #[test]
    fn test_status_rules() {
        let cases = [
            (429, RATE_LIMITED_MESSAGE),
            (500, SERVICE_MESSAGE),
            (503, SERVICE_MESSAGE),
            (400, CLIENT_MESSAGE),
            (404, CLIENT_MESSAGE),
            (408, CLIENT_MESSAGE),
            (304, FALLBACK_MESSAGE),
        ];

        for (status, expected) in cases {
            let err = ApiError::from_failure(&response_failure(status), 1);
            assert_eq!(err.message, expected, "status {}", status);
            assert_eq!(err.status.map(|s| s.as_u16()), Some(status));
        }
    }

    #[test]
    fn test_abort_and_invalid_request_fall_back() {
        let err = ApiError::from_failure(&Failure::Transport(TransportError::Aborted), 1);
        assert_eq!(err.message, FALLBACK_MESSAGE);
        assert_eq!(err.status, None);
        assert!(!err.is_network());

        let err = ApiError::from_failure(
            &Failure::Transport(TransportError::InvalidRequest("bad header".into())),
            1,
        );
        assert_eq!(err.message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_unreadable_success_body_keeps_status() {
        let err = ApiError::from_failure(
            &Failure::Transport(TransportError::Body {
                status: StatusCode::OK,
                source: Box::new(std::io::Error::other("unexpected eof")),
            }),
            1,
        );
        assert_eq!(err.message, FALLBACK_MESSAGE);
        assert_eq!(err.status, Some(StatusCode::OK));
        assert!(!err.is_network());
    }

    #[test]
    fn test_is_network_requires_missing_status() {
        assert!(ApiError::new(NETWORK_MESSAGE, None, 1).is_network());
        assert!(!ApiError::new(NETWORK_MESSAGE, Some(StatusCode::BAD_GATEWAY), 1).is_network());
        assert!(!ApiError::new("Offline", None, 1).is_network());
    }

    #[test]
    fn test_raw_text_never_leaks() {
        let err = ApiError::from_failure(&response_failure(502), 4);
        assert!(!err.to_string().contains("raw upstream text"));
        assert_eq!(err.to_string(), SERVICE_MESSAGE);
    }
}
