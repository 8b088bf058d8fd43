// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bureaucrat` — the broker binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tectonic_broker::{Broker, BrokerConfig};
use tectonic_core::rotate::LogRotation;
use tectonic_core::{env, start_rotation_thread, LogTree};

/// How often the broker checks its own stdout/stderr for rotation.
const SELF_ROTATE_INTERVAL: Duration = Duration::from_secs(30);

/// The bureaucrat manages shared resources such as log files and sockets.
#[derive(Debug, Parser)]
#[command(name = "bureaucrat")]
struct Args {
    /// Where to open logs
    #[arg(long, short = 'l', default_value = "logs")]
    log_dir: PathBuf,

    /// How often to rotate logs, in seconds
    #[arg(long, short = 'r', default_value_t = 1)]
    rotate_interval: u64,
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
    let log_tree = LogTree::new(&args.log_dir);
    log_tree.ensure().context("could not prepare log directories")?;

    // Our own stdout/stderr are log files too; keep fds 1 and 2 rotating
    // in place.
    let own_logs = log_tree.bureaucrat();
    start_rotation_thread(
        vec![
            LogRotation::new(own_logs.join("stdout"))?.bind_fd(1),
            LogRotation::new(own_logs.join("stderr"))?.bind_fd(2),
        ],
        SELF_ROTATE_INTERVAL,
    )
    .context("could not start stdio rotation")?;

    let config = BrokerConfig::new(log_tree, Duration::from_secs(args.rotate_interval));
    let (broker, listener) = Broker::bind(config).context("broker startup failed")?;

    let shutdown = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
            tracing::info!("termination signal received");
            shutdown.cancel();
        });
    }

    broker.run(listener, shutdown).await;
    Ok(())
}
