//! Season and year-range logic
//!
//! Different data categories exist upstream from different years (play-by-play
//! from 2004, betting lines from 2013, ...). Ranges end at the current season.

use crate::constants::season::SEASON_START_MONTH;
use chrono::{DateTime, Datelike, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// All years in the range, most recent first when `descending`.
    pub fn years(&self, descending: bool) -> Vec<i32> {
        if descending {
            (self.start..=self.end).rev().collect()
        } else {
            (self.start..=self.end).collect()
        }
    }
}

/// Data categories with distinct upstream availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearCategory {
    Games,
    GamesModern,
    Plays,
    Stats,
    Ratings,
    Recruiting,
    Betting,
    Draft,
    Metrics,
}

impl YearCategory {
    /// First season with data for the category.
    pub fn first_year(self) -> i32 {
        match self {
            YearCategory::Games => 1869,
            YearCategory::GamesModern => 2000,
            YearCategory::Plays => 2004,
            YearCategory::Stats => 2004,
            YearCategory::Ratings => 2004,
            YearCategory::Recruiting => 2000,
            YearCategory::Betting => 2013,
            YearCategory::Draft => 2000,
            YearCategory::Metrics => 2014,
        }
    }

    pub fn range(self, current_season: i32) -> YearRange {
        YearRange::new(self.first_year(), current_season)
    }
}

/// How years are chosen when none are given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Current season only
    #[default]
    Incremental,
    /// Every available season, newest first
    Backfill,
}

/// Returns the current season year.
/// The season runs August through January, so before August it is still last year's season.
pub fn current_season() -> i32 {
    current_season_at(Local::now())
}

pub fn current_season_at(now: DateTime<Local>) -> i32 {
    if now.month() < SEASON_START_MONTH {
        now.year() - 1
    } else {
        now.year()
    }
}

/// Resolves the years to load: explicit years win, otherwise the mode decides.
pub fn resolve_years(
    explicit: Option<&[i32]>,
    mode: LoadMode,
    category: YearCategory,
    current_season: i32,
) -> Vec<i32> {
    match explicit {
        Some(years) if !years.is_empty() => years.to_vec(),
        _ => match mode {
            LoadMode::Incremental => vec![current_season],
            LoadMode::Backfill => category.range(current_season).years(true),
        },
    }
}

/// Splits years into batches of `batch_size`. A zero batch size yields a single batch.
pub fn batch_years(years: &[i32], batch_size: usize) -> Vec<Vec<i32>> {
    if batch_size == 0 {
        return vec![years.to_vec()];
    }
    years.chunks(batch_size).map(<[i32]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_year_range_iteration_descending() {
        let range = YearRange::new(2020, 2023);
        assert_eq!(range.years(true), vec![2023, 2022, 2021, 2020]);
        assert_eq!(range.years(false), vec![2020, 2021, 2022, 2023]);
    }

    #[test]
    fn test_year_range_contains() {
        let range = YearRange::new(2004, 2026);
        assert!(range.contains(2004));
        assert!(range.contains(2026));
        assert!(!range.contains(2003));
        assert!(!range.contains(2027));
    }

    #[test]
    fn test_category_first_years() {
        assert_eq!(YearCategory::Plays.first_year(), 2004);
        assert_eq!(YearCategory::Betting.first_year(), 2013);
        assert_eq!(YearCategory::Metrics.first_year(), 2014);
        assert_eq!(YearCategory::GamesModern.range(2026).years(true).len(), 27);
    }

    #[test]
    fn test_current_season_before_august() {
        let july = Local.with_ymd_and_hms(2026, 7, 31, 23, 0, 0).unwrap();
        assert_eq!(current_season_at(july), 2025);
    }

    #[test]
    fn test_current_season_from_august() {
        let august = Local.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        assert_eq!(current_season_at(august), 2026);
        let january = Local.with_ymd_and_hms(2027, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(current_season_at(january), 2026);
    }

    #[test]
    fn test_resolve_years() {
        let explicit = [2021, 2020];
        assert_eq!(
            resolve_years(Some(&explicit), LoadMode::Backfill, YearCategory::Plays, 2026),
            vec![2021, 2020]
        );
        assert_eq!(
            resolve_years(None, LoadMode::Incremental, YearCategory::Plays, 2026),
            vec![2026]
        );
        let backfill = resolve_years(None, LoadMode::Backfill, YearCategory::Metrics, 2016);
        assert_eq!(backfill, vec![2016, 2015, 2014]);
        assert_eq!(
            resolve_years(Some(&[]), LoadMode::Incremental, YearCategory::Stats, 2026),
            vec![2026]
        );
    }

    #[test]
    fn test_batch_years() {
        let years = [2020, 2021, 2022, 2023, 2024];
        assert_eq!(
            batch_years(&years, 2),
            vec![vec![2020, 2021], vec![2022, 2023], vec![2024]]
        );
        assert_eq!(batch_years(&years, 0), vec![years.to_vec()]);
        assert_eq!(batch_years(&years, 10), vec![years.to_vec()]);
    }
}
