use crate::endpoints::Source;
use crate::error::AppError;
use crate::years::LoadMode;
use std::fmt;
use std::str::FromStr;

/// Which sources a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    All,
    One(Source),
}

impl SourceSelection {
    /// Sources to run, in load order. `all` leaves out sources that need teams
    /// when none were given.
    pub fn sources(&self, teams: &[String]) -> Vec<Source> {
        match self {
            SourceSelection::One(source) => vec![*source],
            SourceSelection::All => Source::ALL
                .into_iter()
                .filter(|s| !s.requires_teams() || !teams.is_empty())
                .collect(),
        }
    }
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelection::All => f.write_str("all"),
            SourceSelection::One(source) => write!(f, "{source}"),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SourceSelection::All)
        } else {
            s.parse().map(SourceSelection::One)
        }
    }
}

/// Everything a load run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub selection: SourceSelection,
    pub mode: LoadMode,
    /// Explicit years; overrides `mode`
    pub years: Option<Vec<i32>>,
    pub teams: Vec<String>,
    /// Years per load
    pub batch_size: Option<usize>,
    /// First load truncates, later loads append
    pub replace: bool,
    /// game_stats only: one load per week
    pub weekly: bool,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(selection: SourceSelection) -> Self {
        Self {
            selection,
            mode: LoadMode::default(),
            years: None,
            teams: Vec::new(),
            batch_size: None,
            replace: false,
            weekly: false,
            dry_run: false,
        }
    }

    /// Rejects option combinations the runner cannot honour.
    pub fn validate(&self) -> Result<(), AppError> {
        if let SourceSelection::One(source) = self.selection
            && source.requires_teams()
            && self.teams.is_empty()
        {
            return Err(AppError::config_error(format!(
                "--teams is required for the {source} source (example: --source {source} --teams Alabama Georgia \"Ohio State\")"
            )));
        }

        if self.weekly {
            if self.selection != SourceSelection::One(Source::GameStats) {
                return Err(AppError::config_error(
                    "--weekly only applies to --source game_stats",
                ));
            }
            if self.years.as_ref().is_none_or(Vec::is_empty) {
                return Err(AppError::config_error("--weekly requires --years"));
            }
        }

        if self.batch_size == Some(0) {
            return Err(AppError::config_error("--batch-size must be greater than zero"));
        }

        Ok(())
    }

    pub fn explicit_years(&self) -> Option<&[i32]> {
        self.years.as_deref()
    }
}
