use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to fetch data from API: {0}")]
    ApiFetch(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ApiParse(#[from] serde_json::Error),

    // Specific HTTP status code errors
    #[error("API server error ({status}): {message} (URL: {url})")]
    ApiServerError {
        status: u16,
        message: String,
        url: String,
    },

    #[error("API client error ({status}): {message} (URL: {url})")]
    ApiClientError {
        status: u16,
        message: String,
        url: String,
    },

    #[error("API rate limit exceeded (429), retry after {retry_after_secs}s (URL: {url})")]
    ApiRateLimit { retry_after_secs: u64, url: String },

    // Network-specific errors
    #[error("Network timeout while fetching data from: {url}")]
    NetworkTimeout { url: String },

    #[error("Connection failed to: {url} - {message}")]
    NetworkConnection { url: String, message: String },

    #[error("API returned malformed JSON: {message} (URL: {url})")]
    ApiMalformedJson { message: String, url: String },

    // Budget and state errors
    #[error(
        "API budget exhausted: {calls_used}/{monthly_budget} calls used this month. Wait for next month or upgrade tier."
    )]
    BudgetExhausted { calls_used: u64, monthly_budget: u64 },

    #[error("Rate tracker state file error ({path}): {message}")]
    StateFile { path: String, message: String },

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("{failed} of {total} sources failed")]
    SourcesFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log setup error: {0}")]
    LogSetup(String),
}

impl AppError {
    /// Create a configuration error with context
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a log setup error with context
    pub fn log_setup_error(msg: impl Into<String>) -> Self {
        Self::LogSetup(msg.into())
    }

    /// Create a warehouse error with context
    pub fn warehouse_error(msg: impl Into<String>) -> Self {
        Self::Warehouse(msg.into())
    }

    /// Create an API server error (5xx status codes)
    pub fn api_server_error(
        status: u16,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::ApiServerError {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create an API client error (4xx status codes other than 400 and 429)
    pub fn api_client_error(
        status: u16,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::ApiClientError {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create an API rate limit error
    pub fn api_rate_limit(retry_after_secs: u64, url: impl Into<String>) -> Self {
        Self::ApiRateLimit {
            retry_after_secs,
            url: url.into(),
        }
    }

    /// Create a network timeout error
    pub fn network_timeout(url: impl Into<String>) -> Self {
        Self::NetworkTimeout { url: url.into() }
    }

    /// Create a network connection error
    pub fn network_connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkConnection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a malformed JSON error
    pub fn api_malformed_json(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ApiMalformedJson {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create a budget exhausted error
    pub fn budget_exhausted(calls_used: u64, monthly_budget: u64) -> Self {
        Self::BudgetExhausted {
            calls_used,
            monthly_budget,
        }
    }

    /// Create a state file error
    pub fn state_file_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StateFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Budget exhaustion ends the whole run rather than a single source.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, AppError::BudgetExhausted { .. })
    }
}
