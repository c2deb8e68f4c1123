//! Typed result of a single API request

use crate::error::AppError;
use serde_json::Value;
use std::time::Duration;

/// One JSON object returned by the API.
pub type Record = serde_json::Map<String, Value>;

/// What happened to a request, decided from the HTTP status and body.
#[derive(Debug)]
pub enum ApiOutcome {
    /// 2xx with a JSON payload
    Records(Vec<Record>),
    /// 400: the upstream has nothing for these parameters
    NoData,
    /// 429 with the server's retry hint
    RateLimited { retry_after: Duration, url: String },
    /// 5xx, timeouts, connection failures
    Transient(AppError),
    /// Anything retrying will not fix
    Fatal(AppError),
}

impl ApiOutcome {
    /// True when the server answered the request in a way that consumes budget.
    pub fn reached_server(&self) -> bool {
        matches!(self, ApiOutcome::Records(_) | ApiOutcome::NoData)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiOutcome::RateLimited { .. } | ApiOutcome::Transient(_)
        )
    }

    /// `Ok(Some(records))`, `Ok(None)` for no data, or the error to propagate.
    pub fn into_result(self) -> Result<Option<Vec<Record>>, AppError> {
        match self {
            ApiOutcome::Records(records) => Ok(Some(records)),
            ApiOutcome::NoData => Ok(None),
            ApiOutcome::RateLimited { retry_after, url } => {
                Err(AppError::api_rate_limit(retry_after.as_secs(), url))
            }
            ApiOutcome::Transient(e) | ApiOutcome::Fatal(e) => Err(e),
        }
    }
}

/// Parses a 2xx body. Arrays must hold objects; a bare object becomes one record.
pub fn parse_records(body: &str, url: &str) -> ApiOutcome {
    if body.trim().is_empty() {
        return ApiOutcome::Records(Vec::new());
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return ApiOutcome::Fatal(AppError::api_malformed_json(e.to_string(), url));
        }
    };

    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(map) => records.push(map),
                    other => {
                        return ApiOutcome::Fatal(AppError::api_malformed_json(
                            format!("expected an array of objects, found element {other}"),
                            url,
                        ));
                    }
                }
            }
            ApiOutcome::Records(records)
        }
        Value::Object(map) => ApiOutcome::Records(vec![map]),
        Value::Null => ApiOutcome::Records(Vec::new()),
        other => ApiOutcome::Fatal(AppError::api_malformed_json(
            format!("expected a JSON array or object, found {other}"),
            url,
        )),
    }
}
