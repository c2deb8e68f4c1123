use crate::api::CfbdClient;
use crate::cli::Args;
use crate::config::Config;
use crate::endpoints::validate_endpoint_table;
use crate::error::AppError;
use crate::pipeline::{Pipeline, RunOptions, RunPlan, RunSummary, format_status, preflight};
use crate::rate_tracker::RateTracker;
use crate::warehouse::FileWarehouse;
use crate::years::current_season;
use tracing::info;

/// Validates command line argument combinations.
///
/// Returns an error if incompatible arguments are used together.
pub fn validate_args(args: &Args) -> Result<(), AppError> {
    if args.source.is_some() && (args.status || args.list_config || args.is_config_update()) {
        return Err(AppError::config_error(
            "--source cannot be combined with --status, --list-config or config updates",
        ));
    }

    if args.source.is_none() && (args.dry_run || args.replace || args.weekly) {
        return Err(AppError::config_error(
            "--dry-run, --replace and --weekly need a --source",
        ));
    }

    if let Some(options) = args.run_options() {
        options.validate()?;
    }

    Ok(())
}

/// Handles the --list-config command.
pub async fn handle_list_config_command() -> Result<(), AppError> {
    let config = Config::load().await?;
    config.display().await
}

/// Handles configuration update commands (--set-api-key, --set-budget).
///
/// Starts from the saved config file, or defaults when it doesn't exist yet,
/// so values coming from environment overrides are never written back.
pub async fn handle_config_update_command(args: &Args) -> Result<(), AppError> {
    let config_path = Config::get_config_path();
    let mut config = if std::path::Path::new(&config_path).exists() {
        Config::load_from_path(&config_path).await?
    } else {
        Config::default()
    };

    if let Some(api_key) = &args.new_api_key {
        config.api_key = Some(api_key.trim().to_string());
    }

    if let Some(budget) = args.new_monthly_budget {
        config.monthly_budget = budget;
    }

    config.validate()?;
    config.save().await?;
    println!("Config updated successfully!");

    Ok(())
}

/// Handles the --status command: prints this month's usage.
pub fn handle_status_command(config: &Config, json: bool) -> Result<(), AppError> {
    let tracker = RateTracker::load(config.state_file(), config.monthly_budget)?;
    let status = tracker.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", format_status(&status));
    }

    Ok(())
}

/// Handles a load run.
///
/// Checks the endpoint table, the options and the remaining budget before any
/// network call. A dry run prints the plan and stops there. Otherwise the
/// pipeline runs, the budget status is printed, and the run fails when any
/// source failed.
pub async fn handle_run_command(options: &RunOptions, config: &Config) -> Result<(), AppError> {
    validate_endpoint_table()?;
    options.validate()?;

    let mut tracker = RateTracker::load(config.state_file(), config.monthly_budget)?;
    preflight(&tracker)?;

    let season = current_season();

    if options.dry_run {
        let plan = RunPlan::build(options, season, tracker.remaining());
        println!("{plan}");
        return Ok(());
    }

    let client = CfbdClient::from_config(config)?;
    let mut warehouse = FileWarehouse::new(config.warehouse_root());
    info!(
        "Loading {} into {}",
        options.selection,
        warehouse.root().display()
    );

    let result: Result<RunSummary, AppError> = {
        let mut pipeline = Pipeline::new(&client, &mut tracker, &mut warehouse, season);
        pipeline.run(options).await
    };

    tracker.warn_if_low_default();
    println!("{}", format_status(&tracker.status()));

    let summary = result?;
    println!("{summary}");

    let failed = summary.failed();
    if failed > 0 {
        return Err(AppError::SourcesFailed {
            failed,
            total: summary.sources.len(),
        });
    }

    Ok(())
}
