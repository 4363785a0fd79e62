//! Config command handlers

use std::path::Path;

use anyhow::{Context, Result};

use link3_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, config_path: &Path, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(config).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config_path.display());
        }
        OutputFormat::Human => {
            let not_set = || "(not set)".to_string();
            println!("Configuration:");
            println!(
                "  gateway_url:          {}",
                config.gateway_url.clone().unwrap_or_else(not_set)
            );
            println!(
                "  upload_url:           {}",
                config.upload_url.clone().unwrap_or_else(not_set)
            );
            println!(
                "  account_id:           {}",
                config.account_id.clone().unwrap_or_else(not_set)
            );
            println!("  link_limit:           {}", config.link_limit);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  ipfs_gateway:         {}", config.ipfs_gateway);
            println!("  log_level:            {}", config.log_level);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(not_set)
            );
            println!();
            println!("Config file: {}", config_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
///
/// An empty value or `none` clears optional keys.
pub fn set(
    mut config: Config,
    key: String,
    value: String,
    config_path: &Path,
    output: &Output,
) -> Result<()> {
    let stored = if value == "none" { "" } else { value.as_str() };
    config.set(&key, stored)?;
    config
        .save_to_path(config_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
