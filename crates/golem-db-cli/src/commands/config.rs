//! Config command handlers

use anyhow::{bail, Context, Result};

use golem_db::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &[&str] = &["data_dir", "busy_timeout_ms", "log_level", "max_stored_hosts"];

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{:#}",
                serde_json::json!({
                    "data_dir": config.data_dir.display().to_string(),
                    "database_path": config.database_path().display().to_string(),
                    "busy_timeout_ms": config.busy_timeout_ms,
                    "log_level": config.log_level,
                    "max_stored_hosts": config.max_stored_hosts
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.database_path().display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!("  busy_timeout_ms:  {}", config.busy_timeout_ms);
            println!("  log_level:        {}", config.log_level);
            println!("  max_stored_hosts: {}", config.max_stored_hosts);
            println!();
            println!("Database:    {}", config.database_path().display());
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: &str, value: &str, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply(&mut config, key, value)?;

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "busy_timeout_ms" => {
            config.busy_timeout_ms = value
                .parse()
                .context("Invalid value for busy_timeout_ms. Use a number of milliseconds.")?;
        }
        "log_level" => {
            config.log_level = value.to_string();
        }
        "max_stored_hosts" => {
            config.max_stored_hosts = value
                .parse()
                .context("Invalid value for max_stored_hosts. Use a positive number.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS.join(", ")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::with_data_dir("/old");

        apply(&mut config, "data_dir", "/new").unwrap();
        apply(&mut config, "busy_timeout_ms", "1500").unwrap();
        apply(&mut config, "log_level", "debug").unwrap();
        apply(&mut config, "max_stored_hosts", "8").unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/new"));
        assert_eq!(config.busy_timeout_ms, 1500);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_stored_hosts, 8);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::with_data_dir("/old");

        assert!(apply(&mut config, "busy_timeout_ms", "soon").is_err());
        assert!(apply(&mut config, "max_stored_hosts", "-1").is_err());
        assert!(apply(&mut config, "data_dir", "").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());

        assert_eq!(config.data_dir, PathBuf::from("/old"));
        assert_eq!(config.busy_timeout_ms, 30_000);
    }
}
