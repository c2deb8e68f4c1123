// src/main.rs
use cfb_pipeline::cli::Args;
use cfb_pipeline::commands::{
    handle_config_update_command, handle_list_config_command, handle_run_command,
    handle_status_command, validate_args,
};
use cfb_pipeline::config::Config;
use cfb_pipeline::error::AppError;
use cfb_pipeline::logging::setup_logging;
use clap::{CommandFactory, Parser};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    validate_args(&args)?;

    // The guard flushes the log file when main returns
    let (log_file_path, _guard) = setup_logging(&args).await?;
    debug!("Logging to {}", log_file_path);

    if args.list_config {
        return handle_list_config_command().await;
    }

    if args.is_config_update() {
        return handle_config_update_command(&args).await;
    }

    let config = Config::load().await?;

    if args.status {
        return handle_status_command(&config, args.json);
    }

    let Some(options) = args.run_options() else {
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    let result = handle_run_command(&options, &config).await;
    if let Err(e) = &result {
        error!("Run failed: {}", e);
    }
    result
}
