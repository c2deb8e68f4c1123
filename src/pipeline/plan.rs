//! Dry-run planning: what a run would load and roughly how many calls it costs.

use crate::endpoints::Source;
use crate::extract::SeasonType;
use crate::pipeline::options::RunOptions;
use crate::years::{batch_years, resolve_years};
use std::fmt;

/// Years a source would load under `options`. Sources without years get none.
pub fn years_for(source: Source, options: &RunOptions, current_season: i32) -> Vec<i32> {
    match source.year_category() {
        Some(category) => resolve_years(
            options.explicit_years(),
            options.mode,
            category,
            current_season,
        ),
        None => Vec::new(),
    }
}

/// Year batches a source would load in. Always at least one batch.
pub fn batches_for(years: &[i32], batch_size: Option<usize>) -> Vec<Vec<i32>> {
    match batch_size {
        Some(size) if !years.is_empty() => batch_years(years, size),
        _ => vec![years.to_vec()],
    }
}

/// Loads performed by `--weekly` for the given years.
pub fn weekly_runs(years: &[i32]) -> usize {
    let weeks: u32 = SeasonType::ALL.iter().map(|st| st.week_count()).sum();
    years.len() * weeks as usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub source: Source,
    pub years: Vec<i32>,
    pub batches: Vec<Vec<i32>>,
    pub weekly_runs: Option<usize>,
    pub estimated_calls: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub options: RunOptions,
    pub entries: Vec<PlanEntry>,
    pub remaining: i64,
}

impl RunPlan {
    pub fn build(options: &RunOptions, current_season: i32, remaining: i64) -> Self {
        let entries = options
            .selection
            .sources(&options.teams)
            .into_iter()
            .map(|source| {
                let years = years_for(source, options, current_season);
                let batches = batches_for(&years, options.batch_size);
                let weekly_runs = (options.weekly && source == Source::GameStats)
                    .then(|| weekly_runs(&years));
                let estimated_calls = source.estimated_calls(years.len(), options.teams.len());
                PlanEntry {
                    source,
                    years,
                    batches,
                    weekly_runs,
                    estimated_calls,
                }
            })
            .collect();

        Self {
            options: options.clone(),
            entries,
            remaining,
        }
    }

    pub fn total_estimated_calls(&self) -> u64 {
        self.entries.iter().map(|e| e.estimated_calls).sum()
    }

    pub fn exceeds_budget(&self) -> bool {
        i64::try_from(self.total_estimated_calls()).map_or(true, |total| total > self.remaining)
    }
}

fn format_years(years: &[i32]) -> String {
    match years {
        [] => "-".to_string(),
        [only] => only.to_string(),
        [first, .., last] if years.len() > 4 => {
            format!("{}..{} ({} years)", first, last, years.len())
        }
        _ => years
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

impl fmt::Display for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[DRY RUN] Source: {}", self.options.selection)?;
        writeln!(f, "[DRY RUN] Mode: {:?}", self.options.mode)?;
        if !self.options.teams.is_empty() {
            writeln!(f, "[DRY RUN] Teams: {}", self.options.teams.join(", "))?;
        }
        if let Some(size) = self.options.batch_size {
            writeln!(f, "[DRY RUN] Batch size: {size}")?;
        }
        writeln!(f)?;

        for entry in &self.entries {
            write!(
                f,
                "  {:15}  years {:24}  ~{} API calls",
                entry.source.name(),
                format_years(&entry.years),
                entry.estimated_calls
            )?;
            if let Some(runs) = entry.weekly_runs {
                write!(f, "  ({runs} weekly loads)")?;
            } else if entry.batches.len() > 1 {
                write!(f, "  ({} batches)", entry.batches.len())?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        writeln!(f, "  Total estimated:  ~{} calls", self.total_estimated_calls())?;
        write!(f, "  Budget remaining: {} calls", self.remaining)?;
        if self.exceeds_budget() {
            write!(f, "\n  WARNING: estimated calls may exceed the remaining budget")?;
        }
        Ok(())
    }
}
