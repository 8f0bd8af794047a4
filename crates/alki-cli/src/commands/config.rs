//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use alki_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str =
    "api_url, mode, backend, data_dir, quiet_period_ms, request_timeout_secs, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "mode": config.mode,
                    "backend": config.backend,
                    "data_dir": config.data_dir,
                    "quiet_period_ms": config.quiet_period_ms,
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.api_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  api_url:              {}", config.api_url);
            println!("  mode:                 {:?}", config.mode);
            println!("  backend:              {:?}", config.backend);
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  quiet_period_ms:      {}", config.quiet_period_ms);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "api_url" => {
            if value.is_empty() {
                bail!("api_url cannot be empty");
            }
            config.api_url = value.to_string();
        }
        "mode" => {
            config.mode = value.parse()?;
        }
        "backend" => {
            config.backend = value.parse()?;
        }
        "data_dir" => {
            config.data_dir = value.into();
        }
        "quiet_period_ms" => {
            config.quiet_period_ms = value
                .parse()
                .context("Invalid value for quiet_period_ms. Use a number of milliseconds.")?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a number of seconds.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alki_core::SyncMode;
    use tempfile::TempDir;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "mode", "local").unwrap();
        apply(&mut config, "quiet_period_ms", "250").unwrap();
        apply(&mut config, "log_file", "/tmp/alki.log").unwrap();

        assert_eq!(config.mode, SyncMode::Local);
        assert_eq!(config.quiet_period_ms, 250);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/alki.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "mode", "sometimes").is_err());
        assert!(apply(&mut config, "quiet_period_ms", "soon").is_err());
        assert!(apply(&mut config, "api_url", "").is_err());
        assert!(apply(&mut config, "colour", "blue").is_err());
        assert_eq!(config.mode, SyncMode::Remote);
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "api_url".to_string(),
            "http://example.test/api/items".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.api_url, "http://example.test/api/items");
    }
}
