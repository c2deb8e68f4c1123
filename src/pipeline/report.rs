//! Run summaries and budget status output.

use crate::endpoints::Source;
use crate::rate_tracker::UsageStatus;
use crate::warehouse::LoadInfo;
use std::fmt;
use std::time::Duration;

/// What one source did during a run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub duration: Duration,
    pub calls: u64,
    pub loads: Vec<LoadInfo>,
    /// Set when the source failed
    pub error: Option<String>,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn records_loaded(&self) -> usize {
        self.loads.iter().map(|l| l.received).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    pub fn total_calls(&self) -> u64 {
        self.sources.iter().map(|s| s.calls).sum()
    }

    pub fn total_duration(&self) -> Duration {
        self.sources.iter().map(|s| s.duration).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run summary ===")?;
        for report in &self.sources {
            let status = match &report.error {
                None => "ok".to_string(),
                Some(e) => format!("FAILED: {e}"),
            };
            writeln!(
                f,
                "  {:15} {:>8.1}s  {:>6} calls  {:>8} records  {}",
                report.source.name(),
                report.duration.as_secs_f64(),
                report.calls,
                report.records_loaded(),
                status
            )?;
        }
        write!(
            f,
            "  {} succeeded, {} failed, {} calls in {:.1}s",
            self.succeeded(),
            self.failed(),
            self.total_calls(),
            self.total_duration().as_secs_f64()
        )
    }
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Human-readable budget status block.
pub fn format_status(status: &UsageStatus) -> String {
    let to_i64 = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
    format!(
        "=== CFB Pipeline Status ===\n\n\
         Month:           {}\n\
         API Calls Used:  {}\n\
         Remaining:       {}\n\
         Monthly Budget:  {}\n\
         Usage:           {:.1}%\n",
        status.month,
        format_thousands(to_i64(status.calls_used)),
        format_thousands(status.remaining),
        format_thousands(to_i64(status.monthly_budget)),
        status.usage_percent
    )
}
