//! Load runs: pre-flight budget check, per-source extraction and loading,
//! batching, and the multi-source driver.

pub mod options;
pub mod plan;
pub mod report;

pub use options::{RunOptions, SourceSelection};
pub use plan::RunPlan;
pub use report::{RunSummary, SourceReport, format_status, format_thousands};

use crate::api::ApiSource;
use crate::constants::budget::MIN_CALLS_TO_START;
use crate::endpoints::{Source, WriteDisposition};
use crate::error::AppError;
use crate::extract::{Extractor, SeasonType};
use crate::rate_tracker::RateTracker;
use crate::warehouse::{LoadInfo, TableSpec, Warehouse};
use plan::{batches_for, years_for};
use std::time::Instant;
use tracing::{error, info, warn};

/// Disposition for the `index`-th load of a table. With `replace` the first
/// load truncates and later loads append.
pub fn load_disposition(
    default: WriteDisposition,
    replace: bool,
    index: usize,
) -> WriteDisposition {
    match (replace, index) {
        (false, _) => default,
        (true, 0) => WriteDisposition::Replace,
        (true, _) => WriteDisposition::Append,
    }
}

/// Disposition for the `run`-th weekly load. Weeks can overlap, so after a
/// replacing first run the table's own disposition applies.
pub fn weekly_disposition(
    default: WriteDisposition,
    replace: bool,
    run: usize,
) -> WriteDisposition {
    if replace && run == 0 {
        WriteDisposition::Replace
    } else {
        default
    }
}

/// Refuses to start a run with fewer than [`MIN_CALLS_TO_START`] calls left.
pub fn preflight(tracker: &RateTracker) -> Result<(), AppError> {
    if !tracker.check_budget(MIN_CALLS_TO_START) {
        error!(
            "API budget nearly exhausted. {} calls remaining. Wait for next month or upgrade your CFBD tier.",
            tracker.remaining()
        );
        return Err(AppError::budget_exhausted(
            tracker.calls_used(),
            tracker.monthly_budget(),
        ));
    }
    Ok(())
}

pub struct Pipeline<'a, S: ApiSource, W: Warehouse> {
    api: &'a S,
    tracker: &'a mut RateTracker,
    warehouse: &'a mut W,
    current_season: i32,
}

impl<'a, S: ApiSource, W: Warehouse> Pipeline<'a, S, W> {
    pub fn new(
        api: &'a S,
        tracker: &'a mut RateTracker,
        warehouse: &'a mut W,
        current_season: i32,
    ) -> Self {
        Self {
            api,
            tracker,
            warehouse,
            current_season,
        }
    }

    pub fn preflight(&self) -> Result<(), AppError> {
        preflight(&*self.tracker)
    }

    /// Runs every selected source in load order.
    ///
    /// With `all`, a failing source is logged and counted and the run moves on;
    /// budget exhaustion still ends the run. A single selected source fails the
    /// run with its own error.
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunSummary, AppError> {
        options.validate()?;
        self.preflight()?;

        let sources = options.selection.sources(&options.teams);
        if options.selection == SourceSelection::All && !sources.contains(&Source::Rosters) {
            info!("Skipping rosters: no --teams given");
        }

        let mut summary = RunSummary::default();
        for source in sources {
            info!("=== Loading {} ===", source);
            let started = Instant::now();
            let calls_before = self.tracker.calls_used();

            let result = self.run_source(source, options).await;

            let calls = self.tracker.calls_used().saturating_sub(calls_before);
            let duration = started.elapsed();

            match result {
                Ok(loads) => {
                    info!(
                        "{} complete: {} loads, {} calls in {:.1}s",
                        source,
                        loads.len(),
                        calls,
                        duration.as_secs_f64()
                    );
                    summary.sources.push(SourceReport {
                        source,
                        duration,
                        calls,
                        loads,
                        error: None,
                    });
                }
                Err(e) if e.is_budget_exhausted() => {
                    error!("{}: {}", source, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Error in {}: {}", source, e);
                    if let SourceSelection::One(_) = options.selection {
                        return Err(e);
                    }
                    summary.sources.push(SourceReport {
                        source,
                        duration,
                        calls,
                        loads: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if summary.failed() > 0 {
            warn!(
                "{} of {} sources failed",
                summary.failed(),
                summary.sources.len()
            );
        }
        Ok(summary)
    }

    /// Extracts and loads every endpoint of `source`, batch by batch.
    pub async fn run_source(
        &mut self,
        source: Source,
        options: &RunOptions,
    ) -> Result<Vec<LoadInfo>, AppError> {
        let years = years_for(source, options, self.current_season);
        if options.weekly && source == Source::GameStats {
            return self.run_weekly(source, &years, options.replace).await;
        }

        let batches = batches_for(&years, options.batch_size);
        let mut loads = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            if batches.len() > 1 {
                info!("Batch {}/{}: {:?}", index + 1, batches.len(), batch);
            }

            for endpoint in source.endpoints() {
                // Year-independent endpoints load once per run
                if index > 0 && !endpoint.partition.needs_years() {
                    continue;
                }

                let mut extractor = Extractor::new(self.api, &mut *self.tracker);
                let records = extractor
                    .extract_endpoint(endpoint, batch, &options.teams, self.current_season)
                    .await?;

                let disposition = load_disposition(endpoint.disposition, options.replace, index);
                let table = TableSpec::from_endpoint(endpoint).with_disposition(disposition);
                loads.push(self.warehouse.load(&table, records)?);
            }
        }

        Ok(loads)
    }

    /// One load per (year, season type, week) for each endpoint of `source`.
    async fn run_weekly(
        &mut self,
        source: Source,
        years: &[i32],
        replace: bool,
    ) -> Result<Vec<LoadInfo>, AppError> {
        let mut loads = Vec::new();
        let mut run = 0usize;

        for &year in years {
            for season_type in SeasonType::ALL {
                for week in season_type.weeks() {
                    for endpoint in source.endpoints() {
                        let disposition =
                            weekly_disposition(endpoint.disposition, replace, run);
                        info!(
                            "[{}] {} {} {} week {} ({})",
                            run + 1,
                            endpoint.table,
                            year,
                            season_type,
                            week,
                            disposition
                        );

                        let mut extractor = Extractor::new(self.api, &mut *self.tracker);
                        let records = extractor
                            .extract_week_partitioned(
                                endpoint,
                                &[year],
                                &[season_type],
                                Some(&[week]),
                            )
                            .await?;

                        let table =
                            TableSpec::from_endpoint(endpoint).with_disposition(disposition);
                        loads.push(self.warehouse.load(&table, records)?);
                    }
                    run += 1;
                }
            }
        }

        info!(
            "Weekly loading complete: {} runs across {} years",
            run,
            years.len()
        );
        Ok(loads)
    }
}
