//! Configuration model.

use serde::{Deserialize, Serialize};

/// Main configuration structure for wavelength.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pipeline execution configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".wavelength/wavelength.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Pipeline execution configuration.
///
/// `stage_timeout_secs` must be strictly less than `invocation_budget_secs`
/// so a stage can always persist its terminal state before the enclosing
/// invocation is cut off. Enforced by `ConfigLoader::validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Model identifier stamped into run ids and pipeline_runs rows
    #[serde(default = "default_model")]
    pub model: String,

    /// Pipeline version recorded per run
    #[serde(default = "default_pipeline_version")]
    pub pipeline_version: String,

    /// Concurrency ceiling for independent-stage fan-out (1-16)
    #[serde(default = "default_max_concurrent_stages")]
    pub max_concurrent_stages: usize,

    /// Hard timeout for a single stage's analysis call
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Wall-clock budget for one worker invocation
    #[serde(default = "default_invocation_budget_secs")]
    pub invocation_budget_secs: u64,

    /// Minimum completed independent stages required to pass the research
    /// gate (1-7); fewer means total research failure
    #[serde(default = "default_min_scored_stages")]
    pub min_scored_stages: usize,

    /// Maximum dispatch attempts per stage before its error is final
    #[serde(default = "default_max_stage_attempts")]
    pub max_stage_attempts: u32,

    /// Maximum attempts per run job before it is marked failed
    #[serde(default = "default_max_job_attempts")]
    pub max_job_attempts: u32,

    /// Base delay for job retry backoff, doubled per attempt
    #[serde(default = "default_job_backoff_base_ms")]
    pub job_backoff_base_ms: u64,
}

fn default_model() -> String {
    "sonnet-4-6".to_string()
}

fn default_pipeline_version() -> String {
    "1.0".to_string()
}

const fn default_max_concurrent_stages() -> usize {
    4
}

const fn default_stage_timeout_secs() -> u64 {
    120
}

const fn default_invocation_budget_secs() -> u64 {
    300
}

const fn default_min_scored_stages() -> usize {
    3
}

const fn default_max_stage_attempts() -> u32 {
    2
}

const fn default_max_job_attempts() -> u32 {
    3
}

const fn default_job_backoff_base_ms() -> u64 {
    2000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            pipeline_version: default_pipeline_version(),
            max_concurrent_stages: default_max_concurrent_stages(),
            stage_timeout_secs: default_stage_timeout_secs(),
            invocation_budget_secs: default_invocation_budget_secs(),
            min_scored_stages: default_min_scored_stages(),
            max_stage_attempts: default_max_stage_attempts(),
            max_job_attempts: default_max_job_attempts(),
            job_backoff_base_ms: default_job_backoff_base_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
