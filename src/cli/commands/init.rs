//! Implementation of the `wavelength init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::context::open_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

const DEFAULT_CONFIG_YAML: &str = "\
# Wavelength configuration. Environment variables with the WAVELENGTH_
# prefix override these values, e.g. WAVELENGTH_PIPELINE__MODEL=opus-4-6.
database:
  path: .wavelength/wavelength.db
  max_connections: 5
pipeline:
  model: sonnet-4-6
  pipeline_version: \"1.0\"
  max_concurrent_stages: 4
  stage_timeout_secs: 120
  invocation_budget_secs: 300
  min_scored_stages: 3
  max_stage_attempts: 2
  max_job_attempts: 3
  job_backoff_base_ms: 2000
logging:
  level: info
  format: pretty
";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.database_initialized {
            lines.push(format!(
                "Database initialized at {}",
                self.initialized_path
                    .join(".wavelength/wavelength.db")
                    .display()
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let wavelength_dir = target_path.join(".wavelength");

    if wavelength_dir.exists() && !args.force {
        output(
            &InitOutput {
                success: false,
                message: "Project already initialized. Use --force to reinitialize.".to_string(),
                initialized_path: target_path,
                database_initialized: false,
            },
            json_mode,
        );
        return Ok(());
    }

    if args.force && wavelength_dir.exists() {
        fs::remove_dir_all(&wavelength_dir)
            .await
            .context("Failed to remove existing .wavelength directory")?;
    }

    fs::create_dir_all(&wavelength_dir)
        .await
        .context("Failed to create .wavelength directory")?;
    fs::write(wavelength_dir.join("config.yaml"), DEFAULT_CONFIG_YAML)
        .await
        .context("Failed to write default configuration")?;

    let mut config = Config::default();
    config.database.path = wavelength_dir
        .join("wavelength.db")
        .to_string_lossy()
        .into_owned();
    ConfigLoader::validate(&config)?;
    open_database(&config).await?;

    output(
        &InitOutput {
            success: true,
            message: if args.force {
                "Project reinitialized successfully.".to_string()
            } else {
                "Project initialized successfully.".to_string()
            },
            initialized_path: target_path,
            database_initialized: true,
        },
        json_mode,
    );
    Ok(())
}
