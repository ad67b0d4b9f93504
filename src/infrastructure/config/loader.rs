use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_concurrent_stages: {0}. Must be between 1 and 16")]
    InvalidMaxConcurrentStages(usize),

    #[error(
        "Invalid timeouts: stage_timeout_secs ({0}) must be less than invocation_budget_secs ({1})"
    )]
    InvalidTimeouts(u64, u64),

    #[error("Invalid min_scored_stages: {0}. Must be between 1 and 7")]
    InvalidMinScoredStages(usize),

    #[error("Invalid max_stage_attempts: {0}. Cannot be 0")]
    InvalidMaxStageAttempts(u32),

    #[error("Invalid max_job_attempts: {0}. Cannot be 0")]
    InvalidMaxJobAttempts(u32),

    #[error("Model identifier cannot be empty")]
    EmptyModel,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .wavelength/config.yaml (project config, created by init)
    /// 3. .wavelength/local.yaml (local overrides, optional)
    /// 4. Environment variables (WAVELENGTH_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.wavelength/) so one
    /// machine can host several validation stores.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".wavelength/config.yaml"))
            .merge(Yaml::file(".wavelength/local.yaml"))
            .merge(Env::prefixed("WAVELENGTH_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let pipeline = &config.pipeline;
        if pipeline.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        if pipeline.max_concurrent_stages == 0 || pipeline.max_concurrent_stages > 16 {
            return Err(ConfigError::InvalidMaxConcurrentStages(
                pipeline.max_concurrent_stages,
            ));
        }

        // A stage must be able to time out and persist its terminal state
        // before the enclosing invocation is cut off.
        if pipeline.stage_timeout_secs >= pipeline.invocation_budget_secs {
            return Err(ConfigError::InvalidTimeouts(
                pipeline.stage_timeout_secs,
                pipeline.invocation_budget_secs,
            ));
        }

        if pipeline.min_scored_stages == 0 || pipeline.min_scored_stages > 7 {
            return Err(ConfigError::InvalidMinScoredStages(
                pipeline.min_scored_stages,
            ));
        }

        if pipeline.max_stage_attempts == 0 {
            return Err(ConfigError::InvalidMaxStageAttempts(
                pipeline.max_stage_attempts,
            ));
        }

        if pipeline.max_job_attempts == 0 {
            return Err(ConfigError::InvalidMaxJobAttempts(pipeline.max_job_attempts));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
