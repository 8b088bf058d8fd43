// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The launcher: detaches the process tree from the terminal, records the
//! session group, and blocks until the supervisor reports the broker up —
//! or kills what it started and says why.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod daemonize;
pub mod kill;
mod waitfor;

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not register the SIGCHLD pipe: {0}")]
    SignalPipe(#[source] io::Error),

    #[error("supervisor exited immediately after spawn")]
    SupervisorDead,

    #[error(transparent)]
    Os(#[from] nix::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
