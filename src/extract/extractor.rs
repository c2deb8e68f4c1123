//! Chunked extraction under the monthly call budget
//!
//! Every request goes through [`Extractor::request`], which checks the budget
//! first and records the call once the server has answered. Slices that come
//! back as "no data" are skipped; every other failure propagates.

use crate::api::{ApiSource, Record};
use crate::constants::MAX_RECORDS_PER_REQUEST;
use crate::endpoints::{EndpointConfig, Partition};
use crate::error::AppError;
use crate::extract::slices::{ExtractionSlice, SeasonType, plan_slices, week_slices};
use crate::extract::transform::shape_records;
use crate::rate_tracker::RateTracker;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Path used to enumerate game ids for per-game endpoints.
pub const GAMES_PATH: &str = "/games";

pub struct Extractor<'a, S: ApiSource> {
    api: &'a S,
    tracker: &'a mut RateTracker,
    calls_made: u64,
}

impl<'a, S: ApiSource> Extractor<'a, S> {
    pub fn new(api: &'a S, tracker: &'a mut RateTracker) -> Self {
        Self {
            api,
            tracker,
            calls_made: 0,
        }
    }

    pub fn tracker(&self) -> &RateTracker {
        &*self.tracker
    }

    /// Calls recorded by this extractor.
    pub fn calls_made(&self) -> u64 {
        self.calls_made
    }

    /// One budgeted request.
    ///
    /// Returns `Ok(None)` when the upstream reports no data for the parameters.
    /// Fails with [`AppError::BudgetExhausted`] without touching the network
    /// when no call is left this month.
    pub async fn request(
        &mut self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Vec<Record>>, AppError> {
        if !self.tracker.check_budget(1) {
            return Err(AppError::budget_exhausted(
                self.tracker.calls_used(),
                self.tracker.monthly_budget(),
            ));
        }

        let outcome = self.api.get(path, params).await;
        if outcome.reached_server() {
            self.tracker.record_call(1)?;
            self.calls_made += 1;
        }
        outcome.into_result()
    }

    async fn fetch_slice(
        &mut self,
        endpoint: &EndpointConfig,
        slice: &ExtractionSlice,
    ) -> Result<Vec<Record>, AppError> {
        debug!("Requesting {} for {}", endpoint.path, slice);

        match self.request(endpoint.path, &slice.to_params()).await? {
            Some(records) => {
                if records.len() >= MAX_RECORDS_PER_REQUEST {
                    warn!(
                        "{} returned {} records for {}; the response may be capped",
                        endpoint.path,
                        records.len(),
                        slice
                    );
                }
                Ok(shape_records(endpoint, slice, records))
            }
            None => {
                info!("No data for {} ({}), skipping", endpoint.table, slice);
                Ok(Vec::new())
            }
        }
    }

    /// Requests each slice in order and concatenates the shaped records.
    pub async fn extract_slices(
        &mut self,
        endpoint: &EndpointConfig,
        slices: &[ExtractionSlice],
    ) -> Result<Vec<Record>, AppError> {
        let mut records = Vec::new();
        for slice in slices {
            let batch = self.fetch_slice(endpoint, slice).await?;
            debug!("{}: {} records from {}", endpoint.table, batch.len(), slice);
            records.extend(batch);
        }
        Ok(records)
    }

    /// Week decomposition: year, then season type, then week.
    /// `weeks` of `None` walks each season type's full week range.
    pub async fn extract_week_partitioned(
        &mut self,
        endpoint: &EndpointConfig,
        years: &[i32],
        season_types: &[SeasonType],
        weeks: Option<&[u32]>,
    ) -> Result<Vec<Record>, AppError> {
        let mut records = Vec::new();
        for &year in years {
            info!("Loading {} for {}...", endpoint.table, year);
            let slices = week_slices(&[year], season_types, weeks);
            records.extend(self.extract_slices(endpoint, &slices).await?);
        }
        Ok(records)
    }

    /// Game ids for a season in response order: regular season, then postseason.
    pub async fn fetch_game_ids(&mut self, year: i32) -> Result<Vec<i64>, AppError> {
        let mut ids = Vec::new();
        for season_type in SeasonType::ALL {
            let slice = ExtractionSlice::for_season_type(year, season_type);
            match self.request(GAMES_PATH, &slice.to_params()).await? {
                Some(games) => ids.extend(
                    games
                        .iter()
                        .filter_map(|game| game.get("id").and_then(Value::as_i64)),
                ),
                None => info!("No {} games for {}", season_type, year),
            }
        }
        info!("Found {} games for {}", ids.len(), year);
        Ok(ids)
    }

    /// One request per game id, in the given order.
    pub async fn extract_games(
        &mut self,
        endpoint: &EndpointConfig,
        game_ids: &[i64],
        year: Option<i32>,
    ) -> Result<Vec<Record>, AppError> {
        let slices: Vec<ExtractionSlice> = game_ids
            .iter()
            .map(|&id| ExtractionSlice::for_game(year, id))
            .collect();
        self.extract_slices(endpoint, &slices).await
    }

    /// Game-id decomposition: list each year's games, then request each game.
    pub async fn extract_game_partitioned(
        &mut self,
        endpoint: &EndpointConfig,
        years: &[i32],
    ) -> Result<Vec<Record>, AppError> {
        let mut records = Vec::new();
        for &year in years {
            let game_ids = self.fetch_game_ids(year).await?;
            info!(
                "Loading {} for {} games in {}...",
                endpoint.table,
                game_ids.len(),
                year
            );
            records.extend(self.extract_games(endpoint, &game_ids, Some(year)).await?);
        }
        Ok(records)
    }

    /// Extracts an endpoint using its configured partition.
    pub async fn extract_endpoint(
        &mut self,
        endpoint: &EndpointConfig,
        years: &[i32],
        teams: &[String],
        current_season: i32,
    ) -> Result<Vec<Record>, AppError> {
        match endpoint.partition {
            Partition::ByWeek => {
                self.extract_week_partitioned(endpoint, years, &SeasonType::ALL, None)
                    .await
            }
            Partition::ByGameId => self.extract_game_partitioned(endpoint, years).await,
            _ => {
                let slices = plan_slices(endpoint, years, teams, current_season);
                info!(
                    "Loading {} ({} requests)...",
                    endpoint.qualified_table(),
                    slices.len()
                );
                self.extract_slices(endpoint, &slices).await
            }
        }
    }
}
