// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background maintenance threads for cooperating workers.

use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use rand::Rng;

use crate::requests::request_worker_std_pair;

/// How often a worker announces liveness to the supervisor.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Periodically re-request the shared stdout/stderr pair and move it over
/// this process's fds 1 and 2, so writes follow log rotation.
///
/// The interval gets sub-second jitter so a fleet of workers does not stampede
/// the broker on the same tick.
pub fn start_std_refresh_thread(
    socket_path: PathBuf,
    interval: Duration,
) -> io::Result<JoinHandle<()>> {
    let interval = interval + Duration::from_millis(rand::rng().random_range(0..1000));
    std::thread::Builder::new().name("std-refresh".to_string()).spawn(move || loop {
        match request_worker_std_pair(&socket_path) {
            Ok(pair) => {
                if let Err(e) = pair.install() {
                    tracing::warn!(error = %e, "could not install refreshed standard pair");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not refresh standard pair"),
        }
        std::thread::sleep(interval);
    })
}

/// Write one null byte per interval to the supervisor's health pipe.
///
/// Returns `None` when the process was not started under the supervisor
/// (no health pipe in the environment). The thread exits when the pipe
/// closes, which only happens when the supervisor is gone.
pub fn start_heartbeat_thread(interval: Duration) -> io::Result<Option<JoinHandle<()>>> {
    let Some(fd) = tectonic_core::env::health_pipe_fd() else {
        return Ok(None);
    };
    // SAFETY: the supervisor put this inherited descriptor in the
    // environment for us alone; we take ownership of it here.
    let pipe = unsafe { OwnedFd::from_raw_fd(fd) };

    let handle = std::thread::Builder::new().name("heartbeat".to_string()).spawn(move || loop {
        if nix::unistd::write(&pipe, &[0u8]).is_err() {
            tracing::debug!("health pipe closed, stopping heartbeats");
            break;
        }
        std::thread::sleep(interval);
    })?;
    Ok(Some(handle))
}
