//! CLI surface: argument parsing, command dispatch, and output.

use clap::{Parser, Subcommand};

pub mod commands;
pub mod context;
pub mod output;

#[derive(Parser)]
#[command(name = "wavelength")]
#[command(about = "Wavelength - workforce program validation pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration and database
    Init(commands::init::InitArgs),
    /// Project management commands
    Project(commands::project::ProjectArgs),
    /// Process one queued job
    Run(commands::run::RunArgs),
    /// Poll the job queue continuously
    Worker(commands::worker::WorkerArgs),
    /// Show a stored validation report
    Report(commands::report::ReportArgs),
}

/// Print an error the way the selected output mode expects and exit 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
