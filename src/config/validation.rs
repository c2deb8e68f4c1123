use crate::config::Config;
use crate::error::AppError;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - API base URL cannot be empty and must look like a URL or domain
/// - Monthly budget and HTTP timeout must be positive
/// - State file and warehouse paths cannot be empty
/// - If a log file path is provided it cannot be empty, and its parent
///   directory must exist or be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    let base_url = config.api_base_url.trim();
    if base_url.is_empty() {
        return Err(AppError::config_error("API base URL cannot be empty"));
    }

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        // Without a scheme it should at least look like a domain
        if !base_url.contains('.') && !base_url.starts_with("localhost") {
            return Err(AppError::config_error(
                "API base URL must be a valid URL or domain name",
            ));
        }
    }

    if config.monthly_budget == 0 {
        return Err(AppError::config_error(
            "Monthly budget must be greater than zero",
        ));
    }

    if config.http_timeout_seconds == 0 {
        return Err(AppError::config_error(
            "HTTP timeout must be greater than zero",
        ));
    }

    if config.state_file_path.trim().is_empty() {
        return Err(AppError::config_error("State file path cannot be empty"));
    }

    if config.warehouse_dir.trim().is_empty() {
        return Err(AppError::config_error(
            "Warehouse directory cannot be empty",
        ));
    }

    if let Some(log_path) = &config.log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
