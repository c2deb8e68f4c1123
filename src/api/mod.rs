pub mod fetch;
pub mod http_client;
pub mod outcome;

pub use fetch::{ApiSource, CfbdClient, RetryPolicy};
pub use http_client::create_http_client_with_timeout;
pub use outcome::{ApiOutcome, Record, parse_records};
