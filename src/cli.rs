use crate::pipeline::{RunOptions, SourceSelection};
use crate::years::LoadMode;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

fn parse_selection(value: &str) -> Result<SourceSelection, String> {
    value.parse().map_err(|e: crate::error::AppError| e.to_string())
}

/// College football data pipeline
///
/// Loads statistics from the CollegeFootballData API into a local warehouse
/// while keeping the month's API usage under the subscription budget.
///
/// Sources: all, reference, games, game_stats, plays, play_stats, stats,
/// ratings, rankings, recruiting, betting, draft, metrics, wepa, rosters.
///
/// Examples:
///   cfb_pipeline --source games --years 2024
///   cfb_pipeline --source all --mode backfill --dry-run
///   cfb_pipeline --source game_stats --years 2023 2024 --weekly
///   cfb_pipeline --status
#[derive(Parser, Debug)]
#[command(version)]
#[command(styles = get_styles())]
pub struct Args {
    /// Source to load, or `all` for every source in dependency order
    #[arg(short, long, value_parser = parse_selection, help_heading = "Load")]
    pub source: Option<SourceSelection>,

    /// How years are picked when --years is not given
    #[arg(short, long, value_enum, default_value_t = LoadMode::Incremental, help_heading = "Load")]
    pub mode: LoadMode,

    /// Explicit seasons to load, e.g. `--years 2023 2024` or `--years 2023,2024`
    #[arg(short, long, num_args = 1.., value_delimiter = ',', help_heading = "Load")]
    pub years: Option<Vec<i32>>,

    /// Team names for team-partitioned sources (rosters)
    #[arg(short, long, num_args = 1.., help_heading = "Load")]
    pub teams: Vec<String>,

    /// Load this many years at a time
    #[arg(long, value_name = "N", help_heading = "Load")]
    pub batch_size: Option<usize>,

    /// Overwrite target tables instead of merging
    #[arg(long, help_heading = "Load")]
    pub replace: bool,

    /// game_stats only: load week by week
    #[arg(long, help_heading = "Load")]
    pub weekly: bool,

    /// Print the load plan and estimated API calls without calling the API
    #[arg(long, help_heading = "Load")]
    pub dry_run: bool,

    /// Show this month's API usage and exit
    #[arg(long, help_heading = "Budget")]
    pub status: bool,

    /// Print --status as JSON
    #[arg(long, requires = "status", help_heading = "Budget")]
    pub json: bool,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Store the CFBD API key in the config file
    #[arg(long = "set-api-key", value_name = "KEY", help_heading = "Configuration")]
    pub new_api_key: Option<String>,

    /// Store the monthly call budget in the config file
    #[arg(long = "set-budget", value_name = "CALLS", help_heading = "Configuration")]
    pub new_monthly_budget: Option<u64>,

    /// Log at debug level
    #[arg(long, help_heading = "Debug")]
    pub debug: bool,

    /// Write logs to the log file only
    #[arg(short, long, conflicts_with = "debug", help_heading = "Debug")]
    pub quiet: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}

impl Args {
    /// Whether the invocation only edits the config file.
    pub fn is_config_update(&self) -> bool {
        self.new_api_key.is_some() || self.new_monthly_budget.is_some()
    }

    /// Load options for a run, if a source was selected.
    pub fn run_options(&self) -> Option<RunOptions> {
        let selection = self.source?;
        Some(RunOptions {
            selection,
            mode: self.mode,
            years: self.years.clone(),
            teams: self.teams.clone(),
            batch_size: self.batch_size,
            replace: self.replace,
            weekly: self.weekly,
            dry_run: self.dry_run,
        })
    }
}
