//! Application-wide constants and configuration values
//!
//! Budget defaults, HTTP tuning and the season shape used when slicing
//! requests all live here so the rest of the crate has no magic numbers.

/// Base URL of the CollegeFootballData API
pub const DEFAULT_API_BASE_URL: &str = "https://api.collegefootballdata.com";

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of idle connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Upstream cap on records returned by a single request
pub const MAX_RECORDS_PER_REQUEST: usize = 2000;

/// Rate budget defaults
pub mod budget {
    /// Monthly call allowance of the Tier 3 subscription
    pub const DEFAULT_MONTHLY_BUDGET: u64 = 75_000;

    /// Default location of the usage state file, relative to the working directory
    pub const DEFAULT_STATE_FILE: &str = ".dlt/rate_limit_state.json";

    /// A run refuses to start with fewer calls than this remaining
    pub const MIN_CALLS_TO_START: u64 = 10;

    /// Usage percentage at which a low-budget warning is logged
    pub const LOW_BUDGET_WARN_PERCENT: f64 = 90.0;
}

/// Retry configuration
pub mod retry {
    /// Maximum number of retries after the first attempt
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for linear backoff on transient failures (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Wait used when a 429 response carries no usable Retry-After header (seconds)
    pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;
}

/// Season shape used for week-based slicing
pub mod season {
    /// Regular season weeks are 1..=15
    pub const REGULAR_SEASON_WEEKS: u32 = 15;

    /// Postseason weeks are 1..=5
    pub const POSTSEASON_WEEKS: u32 = 5;

    /// Seasons roll over in August; earlier months belong to the previous season
    pub const SEASON_START_MONTH: u32 = 8;
}

/// Environment variable names
pub mod env_vars {
    pub const API_KEY: &str = "CFBD_API_KEY";
    pub const API_BASE_URL: &str = "CFBD_API_BASE_URL";
    pub const MONTHLY_BUDGET: &str = "CFBD_MONTHLY_BUDGET";
    pub const STATE_FILE: &str = "CFBD_STATE_FILE";
    pub const WAREHOUSE_DIR: &str = "CFBD_WAREHOUSE_DIR";
    pub const HTTP_TIMEOUT: &str = "CFBD_HTTP_TIMEOUT";
    pub const LOG_FILE: &str = "CFB_PIPELINE_LOG_FILE";
}
