// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tectonic` — the launcher binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tectonic_core::env;
use tectonic_launcher::daemonize::{run, LaunchConfig};
use tectonic_launcher::kill::kill_tree;

/// Launch the tectonic process tree, or kill a previously launched one.
#[derive(Debug, Parser)]
#[command(name = "tectonic")]
struct Args {
    /// Where to open logs
    #[arg(long, short = 'l', default_value = "logs")]
    log_dir: PathBuf,

    /// How many seconds to wait for successful startup
    #[arg(long, short = 't', default_value_t = 1)]
    timeout: u64,

    /// Process group id file
    #[arg(long, default_value = tectonic_core::PGROUP_PATH)]
    pgroupfile: PathBuf,

    /// Terminate the tree recorded in the process group file
    #[arg(long)]
    kill: bool,

    /// Arguments forwarded to the proctor (worker invocation, count)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    supervisor_args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.kill {
        let code = kill_tree(&args.pgroupfile);
        if code == 0 {
            std::fs::remove_file(&args.pgroupfile)?;
        }
        std::process::exit(code);
    }

    let config = LaunchConfig {
        log_dir: args.log_dir,
        timeout: Duration::from_secs(args.timeout),
        pgroup_file: args.pgroupfile,
        supervisor_args: args.supervisor_args,
    };
    std::process::exit(run(&config)?);
}
