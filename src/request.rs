//! Description of a logical request.

use crate::error::ConfigError;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

/// Everything needed to send (and resend) one request.
///
/// The body is serialized once when the request is built, so every retry sends
/// exactly the same bytes.
///
/// # Examples
///
/// ```
/// use folio_api::ApiRequest;
///
/// let request = ApiRequest::get("/quote")
///     .with_query_param("symbol", "AAPL")
///     .with_header("accept", "application/json")
///     .unwrap();
///
/// assert_eq!(request.path, "/quote");
/// assert_eq!(request.query_params, vec![("symbol".to_string(), "AAPL".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, relative to the provider's base URL.
    pub path: String,

    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Query parameters, in the order they are sent.
    pub query_params: Vec<(String, String)>,

    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a new `ApiRequest` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

/// Parses a header name and value, reporting failures as configuration errors.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let name = HeaderName::try_from(name)
        .map_err(|e| ConfigError::InvalidHeader(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| ConfigError::InvalidHeader(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}
