//! Monthly API call budget, persisted across runs.
//!
//! The tracker owns a small JSON state file:
//!
//! ```json
//! {
//!   "month": "2026-10",
//!   "calls_used": 1234,
//!   "monthly_budget": 75000,
//!   "last_updated": "2026-10-19T08:15:02.123456+03:00"
//! }
//! ```
//!
//! Every recorded call rewrites the whole file before returning. There is no
//! locking and no rename-on-write: two processes sharing one state file race,
//! and the last writer wins.

use crate::constants::budget::LOW_BUDGET_WARN_PERCENT;
use crate::error::AppError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted usage record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageState {
    /// Calendar month the count belongs to, `YYYY-MM`.
    pub month: String,
    #[serde(default)]
    pub calls_used: u64,
    #[serde(default)]
    pub monthly_budget: u64,
    /// ISO-8601 timestamp of the last write. Informational only.
    #[serde(default)]
    pub last_updated: String,
}

impl UsageState {
    pub fn fresh(month: impl Into<String>, monthly_budget: u64) -> Self {
        Self {
            month: month.into(),
            calls_used: 0,
            monthly_budget,
            last_updated: String::new(),
        }
    }
}

/// Point-in-time view of the budget, as shown by `--status`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageStatus {
    pub month: String,
    pub calls_used: u64,
    /// Negative once in-flight calls overran the budget.
    pub remaining: i64,
    pub monthly_budget: u64,
    /// Not clamped; exceeds 100 on overrun.
    pub usage_percent: f64,
}

/// Formats the month key used in the state file.
pub fn month_key(now: DateTime<Local>) -> String {
    now.format("%Y-%m").to_string()
}

/// Durable monthly call counter.
#[derive(Debug)]
pub struct RateTracker {
    state_file: PathBuf,
    state: UsageState,
}

impl RateTracker {
    /// Loads the tracker using the wall clock to decide the current month.
    pub fn load(state_file: impl Into<PathBuf>, monthly_budget: u64) -> Result<Self, AppError> {
        Self::load_at(state_file, monthly_budget, Local::now())
    }

    /// Loads the tracker as of `now`.
    ///
    /// - Missing file: zero calls for the current month.
    /// - File from another month: silently reset to zero for the current month.
    /// - Unreadable or corrupt file: error.
    ///
    /// The configured `monthly_budget` always wins over the persisted one.
    pub fn load_at(
        state_file: impl Into<PathBuf>,
        monthly_budget: u64,
        now: DateTime<Local>,
    ) -> Result<Self, AppError> {
        let state_file = state_file.into();
        let current_month = month_key(now);

        let state = if state_file.exists() {
            let state_error =
                |message: String| AppError::state_file_error(display_path(&state_file), message);
            let content =
                fs::read_to_string(&state_file).map_err(|e| state_error(e.to_string()))?;
            let persisted: UsageState =
                serde_json::from_str(&content).map_err(|e| state_error(e.to_string()))?;

            if persisted.month == current_month {
                debug!(
                    "Loaded usage state for {}: {} calls used",
                    current_month, persisted.calls_used
                );
                UsageState {
                    monthly_budget,
                    ..persisted
                }
            } else {
                info!(
                    "Usage state is for {}, starting a fresh count for {}",
                    persisted.month, current_month
                );
                UsageState {
                    last_updated: persisted.last_updated,
                    ..UsageState::fresh(current_month, monthly_budget)
                }
            }
        } else {
            debug!(
                "No usage state at {}, starting at zero",
                state_file.display()
            );
            UsageState::fresh(current_month, monthly_budget)
        };

        Ok(Self { state_file, state })
    }

    /// Builds a tracker around an explicit state without touching disk.
    pub fn from_state(state_file: impl Into<PathBuf>, state: UsageState) -> Self {
        Self {
            state_file: state_file.into(),
            state,
        }
    }

    pub fn month(&self) -> &str {
        &self.state.month
    }

    pub fn calls_used(&self) -> u64 {
        self.state.calls_used
    }

    pub fn monthly_budget(&self) -> u64 {
        self.state.monthly_budget
    }

    /// Remaining calls this month; negative after an overrun.
    pub fn remaining(&self) -> i64 {
        to_i64(self.state.monthly_budget).saturating_sub(to_i64(self.state.calls_used))
    }

    /// `calls_used / monthly_budget * 100`. A zero budget reports 100.
    pub fn usage_percent(&self) -> f64 {
        if self.state.monthly_budget == 0 {
            return 100.0;
        }
        self.state.calls_used as f64 / self.state.monthly_budget as f64 * 100.0
    }

    /// True when `n` more calls fit in the remaining budget.
    pub fn check_budget(&self, n: u64) -> bool {
        self.state
            .calls_used
            .checked_add(n)
            .is_some_and(|total| total <= self.state.monthly_budget)
    }

    /// Adds `n` calls and persists the state before returning.
    pub fn record_call(&mut self, n: u64) -> Result<(), AppError> {
        self.state.calls_used = self.state.calls_used.saturating_add(n);
        self.state.last_updated = Local::now().to_rfc3339();
        self.save()?;

        debug!(
            "API calls: {}/{} ({:.1}%)",
            self.state.calls_used,
            self.state.monthly_budget,
            self.usage_percent()
        );
        Ok(())
    }

    pub fn status(&self) -> UsageStatus {
        UsageStatus {
            month: self.state.month.clone(),
            calls_used: self.state.calls_used,
            remaining: self.remaining(),
            monthly_budget: self.state.monthly_budget,
            usage_percent: self.usage_percent(),
        }
    }

    /// Logs a warning when usage reached `threshold` percent. Returns whether it warned.
    pub fn warn_if_low(&self, threshold: f64) -> bool {
        let pct = self.usage_percent();
        if pct >= threshold {
            warn!(
                "API budget {:.1}% used. {} calls remaining this month.",
                pct,
                self.remaining()
            );
            true
        } else {
            false
        }
    }

    /// `warn_if_low` at the default 90% threshold.
    pub fn warn_if_low_default(&self) -> bool {
        self.warn_if_low(LOW_BUDGET_WARN_PERCENT)
    }

    /// Overwrites the state file, creating its parent directory when needed.
    fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.state_file.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::state_file_error(display_path(&self.state_file), e.to_string())
            })?;
        }

        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.state_file, content)
            .map_err(|e| AppError::state_file_error(display_path(&self.state_file), e.to_string()))
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(year: i32, month: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    fn write_state(path: &Path, month: &str, calls_used: u64) {
        let state = UsageState {
            month: month.to_string(),
            calls_used,
            monthly_budget: 75_000,
            last_updated: "2026-01-15T10:30:00".to_string(),
        };
        fs::write(path, serde_json::to_string(&state).unwrap()).unwrap();
    }

    #[test]
    fn test_init_no_state_file() {
        let dir = tempdir().unwrap();
        let tracker = RateTracker::load(dir.path().join("state.json"), 1000).unwrap();
        assert_eq!(tracker.calls_used(), 0);
        assert_eq!(tracker.monthly_budget(), 1000);
        assert_eq!(tracker.month(), month_key(Local::now()));
        // Loading never writes
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn test_init_with_existing_state_same_month() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_state(&path, "2026-01", 500);

        let tracker = RateTracker::load_at(&path, 75_000, at(2026, 1)).unwrap();
        assert_eq!(tracker.calls_used(), 500);
        assert_eq!(tracker.month(), "2026-01");
    }

    #[test]
    fn test_monthly_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_state(&path, "2026-01", 74_999);

        let tracker = RateTracker::load_at(&path, 75_000, at(2026, 2)).unwrap();
        assert_eq!(tracker.calls_used(), 0);
        assert_eq!(tracker.month(), "2026-02");
    }

    #[test]
    fn test_configured_budget_wins_over_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_state(&path, "2026-01", 10);

        let tracker = RateTracker::load_at(&path, 1000, at(2026, 1)).unwrap();
        assert_eq!(tracker.monthly_budget(), 1000);
        assert_eq!(tracker.remaining(), 990);
    }

    #[test]
    fn test_state_without_optional_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"month": "2026-03", "calls_used": 7}"#).unwrap();

        let tracker = RateTracker::load_at(&path, 100, at(2026, 3)).unwrap();
        assert_eq!(tracker.calls_used(), 7);
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = RateTracker::load(&path, 100).unwrap_err();
        assert!(matches!(err, AppError::StateFile { .. }));
    }

    #[test]
    fn test_remaining_and_usage_percent() {
        let dir = tempdir().unwrap();
        let mut state = UsageState::fresh("2026-01", 100);
        state.calls_used = 75;
        let tracker = RateTracker::from_state(dir.path().join("s.json"), state);
        assert_eq!(tracker.remaining(), 25);
        assert!((tracker.usage_percent() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_usage_percent_not_clamped() {
        let mut state = UsageState::fresh("2026-01", 100);
        state.calls_used = 130;
        let tracker = RateTracker::from_state("unused.json", state);
        assert_eq!(tracker.remaining(), -30);
        assert!((tracker.usage_percent() - 130.0).abs() < 1e-9);
        assert!(!tracker.check_budget(1));
    }

    #[test]
    fn test_zero_budget_reports_full_usage() {
        let tracker = RateTracker::from_state("unused.json", UsageState::fresh("2026-01", 0));
        assert_eq!(tracker.usage_percent(), 100.0);
        assert!(tracker.check_budget(0));
        assert!(!tracker.check_budget(1));
    }

    #[test]
    fn test_check_budget_sufficient_and_insufficient() {
        let mut state = UsageState::fresh("2026-01", 100);
        state.calls_used = 50;
        assert!(RateTracker::from_state("unused.json", state.clone()).check_budget(10));

        state.calls_used = 95;
        assert!(!RateTracker::from_state("unused.json", state).check_budget(10));
    }

    #[test]
    fn test_check_budget_does_not_overflow() {
        let mut state = UsageState::fresh("2026-01", u64::MAX);
        state.calls_used = u64::MAX - 1;
        let tracker = RateTracker::from_state("unused.json", state);
        assert!(tracker.check_budget(1));
        assert!(!tracker.check_budget(u64::MAX));
    }

    #[test]
    fn test_record_call_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut tracker = RateTracker::load(&path, 100).unwrap();
        tracker.record_call(5).unwrap();
        assert_eq!(tracker.calls_used(), 5);

        let persisted: UsageState =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.calls_used, 5);
        assert_eq!(persisted.monthly_budget, 100);
        assert_eq!(persisted.month, tracker.month());
        assert!(!persisted.last_updated.is_empty());
    }

    #[test]
    fn test_state_file_created_in_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdir").join("state.json");
        let mut tracker = RateTracker::load(&path, 100).unwrap();
        tracker.record_call(1).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reload_after_record_continues_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut tracker = RateTracker::load(&path, 100).unwrap();
        tracker.record_call(4).unwrap();
        drop(tracker);

        let reloaded = RateTracker::load(&path, 100).unwrap();
        assert_eq!(reloaded.calls_used(), 4);
    }

    #[test]
    fn test_get_status() {
        let mut state = UsageState::fresh("2026-01", 1000);
        state.calls_used = 250;
        let status = RateTracker::from_state("unused.json", state).status();
        assert_eq!(status.month, "2026-01");
        assert_eq!(status.calls_used, 250);
        assert_eq!(status.remaining, 750);
        assert_eq!(status.monthly_budget, 1000);
        assert!((status.usage_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_warn_if_low() {
        let mut state = UsageState::fresh("2026-01", 100);
        state.calls_used = 89;
        let tracker = RateTracker::from_state("unused.json", state.clone());
        assert!(!tracker.warn_if_low(90.0));

        state.calls_used = 90;
        let tracker = RateTracker::from_state("unused.json", state);
        assert!(tracker.warn_if_low(90.0));
        assert!(tracker.warn_if_low_default());
    }
}
