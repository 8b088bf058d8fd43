// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `proctor` — the supervisor binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tectonic_core::rotate::LogRotation;
use tectonic_core::{env, start_rotation_thread, LogTree};
use tectonic_supervisor::{LaunchPipe, Supervisor, SupervisorConfig};

/// How often the supervisor checks its own stdout/stderr for rotation.
const SELF_ROTATE_INTERVAL: Duration = Duration::from_secs(30);

/// The proctor keeps a fleet of identical workers running.
#[derive(Debug, Parser)]
#[command(name = "proctor")]
struct Args {
    /// How many workers to run (defaults to the number of CPUs)
    #[arg(long, short = 'n')]
    number: Option<usize>,

    /// Where to open logs
    #[arg(long, short = 'l', default_value = "logs")]
    log_dir: PathBuf,

    /// The worker command and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    worker_invocation: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let launch_pipe = LaunchPipe::from_env();

    let log_tree = LogTree::new(&args.log_dir);
    log_tree.ensure().context("could not prepare log directories")?;

    let own_logs = log_tree.proctor();
    start_rotation_thread(
        vec![
            LogRotation::new(own_logs.join("stdout"))?.bind_fd(1),
            LogRotation::new(own_logs.join("stderr"))?.bind_fd(2),
        ],
        SELF_ROTATE_INTERVAL,
    )
    .context("could not start stdio rotation")?;

    let workers = match args.number {
        Some(number) => number,
        None => std::thread::available_parallelism().map(usize::from).unwrap_or(1),
    };
    let config = SupervisorConfig::new(args.worker_invocation, workers, log_tree);
    let mut supervisor = Supervisor::new(config);

    match supervisor.start().await {
        Ok(()) => launch_pipe.report(true),
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            launch_pipe.report(false);
            let _ = supervisor.shutdown(1).await;
            std::process::exit(1);
        }
    }

    if let Err(e) = supervisor.spawn_workers().await {
        tracing::error!(error = %e, "could not start the worker fleet");
        let _ = supervisor.shutdown(1).await;
        std::process::exit(1);
    }

    let code = match supervisor.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "supervision loop failed");
            supervisor.shutdown(1).await.unwrap_or(1)
        }
    };
    std::process::exit(code);
}
