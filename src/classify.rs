//! Classification of failed attempts.

use crate::{error::TransportError, response::RawResponse};
use http::{HeaderMap, StatusCode};
use std::fmt;

/// How a failed attempt is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// No response: connection failure or timeout.
    Network,
    /// Everything else; never retried.
    Permanent,
}

impl FailureClass {
    /// Returns `true` for the classes the client retries.
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureClass::Permanent)
    }
}

/// A failed attempt: either an error response or no response at all.
#[derive(Debug)]
pub enum Failure {
    /// The provider answered with a non-2xx status.
    Response(RawResponse),
    /// The transport produced no response.
    Transport(TransportError),
}

impl Failure {
    /// Classifies this failure.
    ///
    /// 408 and the other 4xx codes besides 429 are permanent.
    pub fn classify(&self) -> FailureClass {
        match self {
            Failure::Response(response) => match response.status {
                StatusCode::TOO_MANY_REQUESTS => FailureClass::RateLimited,
                status if status.is_server_error() => FailureClass::ServerError,
                _ => FailureClass::Permanent,
            },
            Failure::Transport(TransportError::Network(_) | TransportError::Timeout) => {
                FailureClass::Network
            }
            Failure::Transport(
                TransportError::Aborted
                | TransportError::InvalidRequest(_)
                | TransportError::Body { .. },
            ) => FailureClass::Permanent,
        }
    }

    /// The HTTP status, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Failure::Response(response) => Some(response.status),
            Failure::Transport(TransportError::Body { status, .. }) => Some(*status),
            Failure::Transport(_) => None,
        }
    }

    /// The response headers, if a response was received.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Failure::Response(response) => Some(&response.headers),
            Failure::Transport(_) => None,
        }
    }

    /// Returns `true` if no response arrived and the attempt was not cancelled.
    pub fn is_network(&self) -> bool {
        self.classify() == FailureClass::Network
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Response(response) => write!(f, "HTTP {}", response.status),
            Failure::Transport(err) => write!(f, "{}", err),
        }
    }
}
