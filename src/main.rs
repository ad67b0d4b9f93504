//! Wavelength CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wavelength::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init(args) => wavelength::cli::commands::init::execute(args, cli.json).await,
        Commands::Project(args) => {
            wavelength::cli::commands::project::execute(args, cli.json).await
        }
        Commands::Run(args) => wavelength::cli::commands::run::execute(args, cli.json).await,
        Commands::Worker(args) => wavelength::cli::commands::worker::execute(args, cli.json).await,
        Commands::Report(args) => wavelength::cli::commands::report::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        wavelength::cli::handle_error(err, cli.json);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if std::env::var("WAVELENGTH_LOGGING__FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
