//! College football data pipeline library
//!
//! This library loads statistics from the CollegeFootballData API into a local
//! file warehouse without exceeding the subscription's monthly call budget.
//!
//! The pieces fit together like this:
//!
//! - [`RateTracker`] persists the month's call count and answers budget checks
//! - [`CfbdClient`] performs requests and classifies every response as an [`ApiOutcome`]
//! - [`Extractor`] splits large requests into year, week, game, category or team slices
//! - [`endpoints`] describes every endpoint as an immutable table
//! - [`Pipeline`] drives sources end to end into a [`Warehouse`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use cfb_pipeline::{
//!     AppError, CfbdClient, Config, FileWarehouse, Pipeline, RateTracker, RunOptions,
//!     SourceSelection, endpoints::Source, years::current_season,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let client = CfbdClient::from_config(&config)?;
//!     let mut tracker = RateTracker::load(config.state_file(), config.monthly_budget)?;
//!     let mut warehouse = FileWarehouse::new(config.warehouse_root());
//!
//!     let options = RunOptions {
//!         years: Some(vec![2024]),
//!         ..RunOptions::new(SourceSelection::One(Source::Games))
//!     };
//!
//!     let mut pipeline = Pipeline::new(&client, &mut tracker, &mut warehouse, current_season());
//!     let summary = pipeline.run(&options).await?;
//!     println!("{summary}");
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod endpoints;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod rate_tracker;
pub mod testing_utils;
pub mod warehouse;
pub mod years;

// Re-export commonly used types for convenience
pub use api::{ApiOutcome, ApiSource, CfbdClient, Record};
pub use config::Config;
pub use endpoints::{EndpointConfig, Source, WriteDisposition};
pub use error::AppError;
pub use extract::{ExtractionSlice, Extractor};
pub use pipeline::{Pipeline, RunOptions, RunSummary, SourceSelection};
pub use rate_tracker::{RateTracker, UsageStatus};
pub use warehouse::{FileWarehouse, Warehouse};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
