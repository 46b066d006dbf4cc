//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use folio_api::rate_limit::Notifier;
use folio_api::{ApiRequest, RawResponse, Transport, TransportError};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One scripted outcome of a physical attempt.
#[derive(Debug, Clone)]
pub enum Outcome {
    Status(u16),
    StatusWithHeaders(u16, Vec<(&'static str, String)>),
    Json(u16, serde_json::Value),
    Timeout,
    ConnectionRefused,
    Aborted,
}

impl Outcome {
    fn into_result(self) -> Result<RawResponse, TransportError> {
        match self {
            Outcome::Status(code) => Ok(response(code, Vec::new(), String::new())),
            Outcome::StatusWithHeaders(code, headers) => Ok(response(code, headers, String::new())),
            Outcome::Json(code, body) => Ok(response(code, Vec::new(), body.to_string())),
            Outcome::Timeout => Err(TransportError::Timeout),
            Outcome::ConnectionRefused => Err(TransportError::network(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Outcome::Aborted => Err(TransportError::Aborted),
        }
    }
}

fn response(code: u16, headers: Vec<(&'static str, String)>, body: String) -> RawResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(&value).unwrap(),
        );
    }
    RawResponse::new(StatusCode::from_u16(code).unwrap(), map, body)
}

/// Plays back scripted outcomes in order, repeating the last one once exhausted.
pub struct FakeTransport {
    script: Mutex<VecDeque<Outcome>>,
    last: Mutex<Option<Outcome>>,
    calls: Mutex<Vec<(Instant, ApiRequest)>>,
}

impl FakeTransport {
    pub fn new(script: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: Outcome) -> Self {
        Self::new(vec![outcome])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    /// Time between consecutive attempts.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push((Instant::now(), request.clone()));

        let next = self.script.lock().unwrap().pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = Some(outcome.clone());
                outcome
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .expect("FakeTransport needs at least one scripted outcome"),
        };

        outcome.into_result()
    }
}

/// Collects warnings instead of showing them.
#[derive(Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    pub fn apis(&self) -> Vec<String> {
        self.warnings.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn warn(&self, api: &str, message: &str) {
        self.warnings
            .lock()
            .unwrap()
            .push((api.to_string(), message.to_string()));
    }
}
