//! Config command - View, validate and create the picsync configuration
//!
//! 1. `show`     - Prints the effective configuration (YAML or JSON)
//! 2. `validate` - Loads the file and reports every invalid field
//! 3. `init`     - Writes a config file populated with the defaults

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use picsync_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a configuration file with the default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Outcome of validating one config file
#[derive(Debug)]
struct ValidationOutcome {
    /// Problems as `(field, message)` pairs
    errors: Vec<(String, String)>,
}

impl ValidationOutcome {
    fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ConfigCommand {
    pub fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let path = super::config_path(config_path);
        match self {
            ConfigCommand::Show => Self::execute_show(config_path, &path, format),
            ConfigCommand::Validate => Self::execute_validate(&path, format),
            ConfigCommand::Init { force } => Self::execute_init(&path, *force, format),
        }
    }

    fn execute_show(explicit: Option<&Path>, path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = super::load_config(explicit)?;

        info!(config_path = %path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            if path.exists() {
                formatter.success(&format!("Configuration ({})", path.display()));
            } else {
                formatter.success(&format!("Configuration (defaults, {} not found)", path.display()));
            }
            formatter.info("");
            for line in config.to_yaml()?.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_validate(path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let outcome = validate_file(path);

        if format.is_json() {
            let errors: Vec<_> = outcome
                .errors
                .iter()
                .map(|(field, message)| serde_json::json!({"field": field, "message": message}))
                .collect();
            formatter.print_json(&serde_json::json!({
                "valid": outcome.is_valid(),
                "config_path": path.display().to_string(),
                "errors": errors,
            }));
        } else if outcome.is_valid() {
            formatter.success(&format!("Configuration is valid ({})", path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error(s) ({})",
                outcome.errors.len(),
                path.display()
            ));
            for (field, message) in &outcome.errors {
                formatter.info(&format!("  {field} - {message}"));
            }
        }

        if !outcome.is_valid() {
            bail!("Configuration validation failed");
        }
        Ok(())
    }

    fn execute_init(path: &Path, force: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        write_default_config(path, force)?;
        info!(config_path = %path.display(), "Wrote default configuration");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote default configuration to {}", path.display()));
            formatter.info("Set auth.client_id or auth.client_secret_file, then run 'picsync auth login'");
        }
        Ok(())
    }
}

fn validate_file(path: &Path) -> ValidationOutcome {
    if !path.exists() {
        return ValidationOutcome {
            errors: vec![("file".to_string(), format!("{} not found", path.display()))],
        };
    }
    match Config::load(path) {
        Ok(config) => ValidationOutcome {
            errors: config
                .validate()
                .into_iter()
                .map(|e| (e.field, e.message))
                .collect(),
        },
        Err(e) => ValidationOutcome {
            errors: vec![("file".to_string(), format!("{e:#}"))],
        },
    }
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let yaml = Config::default().to_yaml()?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))
}
