//! Implementation of the `wavelength worker` command: poll the job queue.

use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::info;

use crate::cli::commands::run::describe;
use crate::cli::context::AppContext;
use crate::cli::output::output;
use crate::services::WorkerOutcome;

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Seconds to sleep when the queue is idle
    #[arg(long, default_value = "5")]
    pub poll_interval: u64,

    /// Exit once the queue is drained instead of polling forever
    #[arg(long)]
    pub drain: bool,
}

pub async fn execute(args: WorkerArgs, json_mode: bool) -> Result<()> {
    let ctx = AppContext::init().await?;
    let worker = ctx.worker();
    info!(
        poll_interval = args.poll_interval,
        drain = args.drain,
        "worker started"
    );

    loop {
        let outcome = worker.process_next().await?;
        match outcome {
            WorkerOutcome::Idle => {
                if args.drain {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_secs(args.poll_interval)).await;
            }
            other => output(&describe(&other), json_mode),
        }
    }
}
