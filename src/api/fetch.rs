//! CFBD request execution: one attempt is classified into an [`ApiOutcome`],
//! and rate limits and transient failures are retried a bounded number of times.

use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::api::http_client::create_http_client_with_timeout;
use crate::api::outcome::{ApiOutcome, parse_records};
use crate::config::Config;
use crate::constants::retry;
use crate::error::AppError;

/// Anything that can answer `GET path?params` with an [`ApiOutcome`].
///
/// The extractor depends on this trait only, so tests can script responses.
pub trait ApiSource {
    fn get(&self, path: &str, params: &[(&str, String)]) -> impl Future<Output = ApiOutcome>;
}

/// Bounded retry for rate limits and transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Transient failures wait `base_delay * (attempt + 1)`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry::MAX_RETRIES,
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt + 1)
    }
}

/// Client for the CollegeFootballData API.
#[derive(Debug, Clone)]
pub struct CfbdClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CfbdClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the client from configuration. Fails when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_api_key()?;
        let client = create_http_client_with_timeout(config.http_timeout_seconds, api_key)?;
        Ok(Self::new(client, config.base_url()))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Performs a single request and classifies the result. Never retries.
    pub async fn get_once(&self, path: &str, params: &[(&str, String)]) -> ApiOutcome {
        let url = self.url_for(path);

        let response = match self.client.get(&url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                // Builder and redirect errors will not improve on retry
                return if e.is_timeout() {
                    ApiOutcome::Transient(AppError::network_timeout(&url))
                } else if e.is_connect() || e.is_request() || e.is_body() {
                    ApiOutcome::Transient(AppError::network_connection(&url, e.to_string()))
                } else {
                    ApiOutcome::Fatal(AppError::ApiFetch(e))
                };
            }
        };

        let status = response.status();
        debug!("Response status: {status}");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(retry::DEFAULT_RETRY_AFTER_SECONDS);
            return ApiOutcome::RateLimited {
                retry_after: Duration::from_secs(retry_after),
                url,
            };
        }

        if !status.is_success() {
            let status_code = status.as_u16();
            let reason = status.canonical_reason().unwrap_or("Unknown error");

            return match status_code {
                400 => ApiOutcome::NoData,
                500..=599 => {
                    ApiOutcome::Transient(AppError::api_server_error(status_code, reason, url))
                }
                _ => {
                    error!("HTTP {} - {} (URL: {})", status_code, reason, url);
                    ApiOutcome::Fatal(AppError::api_client_error(status_code, reason, url))
                }
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to read response body from URL {}: {}", url, e);
                return if e.is_timeout() {
                    ApiOutcome::Transient(AppError::network_timeout(&url))
                } else {
                    ApiOutcome::Transient(AppError::ApiFetch(e))
                };
            }
        };

        debug!("Response length: {} bytes", body.len());
        parse_records(&body, &url)
    }
}

impl ApiSource for CfbdClient {
    /// Requests `path` with `params`, sleeping and retrying on 429 and transient
    /// failures. After `max_retries` retries the last outcome is returned as is.
    #[instrument(skip(self, params), fields(base_url = %self.base_url))]
    async fn get(&self, path: &str, params: &[(&str, String)]) -> ApiOutcome {
        debug!("GET {path} {params:?}");

        let mut attempt = 0u32;
        loop {
            let outcome = self.get_once(path, params).await;
            if !outcome.is_retryable() || attempt >= self.retry.max_retries {
                if outcome.is_retryable() {
                    error!(
                        "Giving up on {} after {} retries",
                        path, self.retry.max_retries
                    );
                }
                return outcome;
            }

            let wait = match &outcome {
                ApiOutcome::RateLimited { retry_after, .. } => {
                    info!(
                        "Rate limited on {}. Waiting {:?} (attempt {}/{})",
                        path,
                        retry_after,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    *retry_after
                }
                ApiOutcome::Transient(e) => {
                    let wait = self.retry.transient_delay(attempt);
                    warn!(
                        "Transient error: {}. Retrying in {:?} (attempt {}/{})",
                        e,
                        wait,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    wait
                }
                _ => Duration::ZERO,
            };

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
