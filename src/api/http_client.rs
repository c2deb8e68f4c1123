//! HTTP client creation and configuration

use crate::error::AppError;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;

/// Creates a client with a per-request timeout, connection pooling, and the
/// CFBD bearer token plus JSON `Accept` header on every request.
///
/// # Arguments
/// * `timeout_seconds` - Per-request timeout
/// * `api_key` - CFBD API key sent as `Authorization: Bearer <key>`
pub fn create_http_client_with_timeout(
    timeout_seconds: u64,
    api_key: &str,
) -> Result<Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| {
            AppError::config_error("API key contains characters not allowed in a header")
        })?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(crate::constants::HTTP_POOL_MAX_IDLE_PER_HOST)
        .default_headers(headers)
        .build()
        .map_err(AppError::ApiFetch)
}

/// Creates an HTTP client for testing with default timeout
#[cfg(test)]
pub fn create_test_http_client() -> Client {
    create_http_client_with_timeout(crate::constants::DEFAULT_HTTP_TIMEOUT_SECONDS, "test-key")
        .expect("Failed to create test HTTP client")
}
