// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotation of the shared worker log pair.
//!
//! The broker's own stdout/stderr rotate in place (bound to fds 1 and 2,
//! see `tectonic_core::rotate`); the worker pair instead gets a complete
//! replacement published under the lock, so a request can never observe a
//! half-rotated pair or receive a descriptor pointing at an archive file.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use tectonic_core::rotate::LogRotation;
use tectonic_core::{open_log_fd, LogTree};

/// The broker-owned worker stdout/stderr descriptors.
///
/// Always the current live log files; replaced wholesale on rotation.
#[derive(Debug)]
pub struct SharedStdPair {
    pub stdout: OwnedFd,
    pub stderr: OwnedFd,
}

impl SharedStdPair {
    pub fn raw_fds(&self) -> [RawFd; 2] {
        [self.stdout.as_raw_fd(), self.stderr.as_raw_fd()]
    }
}

/// Open the initial worker log pair under `tree`.
pub fn open_worker_pair(tree: &LogTree) -> io::Result<SharedStdPair> {
    Ok(SharedStdPair {
        stdout: open_log_fd(&tree.workers().join("stdout"))?,
        stderr: open_log_fd(&tree.workers().join("stderr"))?,
    })
}

/// The worker-pair rotation task.
pub struct WorkerPairRotation {
    stdout: LogRotation,
    stderr: LogRotation,
    pair: Arc<Mutex<SharedStdPair>>,
}

impl WorkerPairRotation {
    pub fn new(
        tree: &LogTree,
        max_size: u64,
        iterations: u32,
        pair: Arc<Mutex<SharedStdPair>>,
    ) -> io::Result<Self> {
        Ok(Self {
            stdout: LogRotation::with_limits(tree.workers().join("stdout"), max_size, iterations)?,
            stderr: LogRotation::with_limits(tree.workers().join("stderr"), max_size, iterations)?,
            pair,
        })
    }

    /// Tick on `interval` until cancelled, with one final check on the way
    /// out so a shutdown does not strand an oversized file.
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => self.tick(),
            }
        }
        self.tick();
    }

    /// Rotate whichever of the two files outgrew the threshold and publish
    /// a complete replacement pair.
    fn tick(&self) {
        let fresh_stdout = self.rotate_one(&self.stdout);
        let fresh_stderr = self.rotate_one(&self.stderr);
        if fresh_stdout.is_none() && fresh_stderr.is_none() {
            return;
        }

        let mut current = self.pair.lock();
        let replacement = match build_replacement(&current, fresh_stdout, fresh_stderr) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "could not assemble replacement std pair");
                return;
            }
        };
        *current = replacement;
        tracing::info!("published rotated worker std pair");
    }

    fn rotate_one(&self, rotation: &LogRotation) -> Option<OwnedFd> {
        match rotation.rotate() {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!(path = %rotation.path().display(), error = %e, "rotation failed");
                None
            }
        }
    }
}

/// Assemble a full replacement pair, duplicating whichever side did not
/// rotate this tick.
fn build_replacement(
    current: &SharedStdPair,
    fresh_stdout: Option<OwnedFd>,
    fresh_stderr: Option<OwnedFd>,
) -> nix::Result<SharedStdPair> {
    let stdout = match fresh_stdout {
        Some(fd) => fd,
        None => duplicate(&current.stdout)?,
    };
    let stderr = match fresh_stderr {
        Some(fd) => fd,
        None => duplicate(&current.stderr)?,
    };
    Ok(SharedStdPair { stdout, stderr })
}

fn duplicate(fd: &OwnedFd) -> nix::Result<OwnedFd> {
    let raw = nix::unistd::dup(fd.as_raw_fd())?;
    // SAFETY: dup just handed us a fresh descriptor nobody else references.
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod tests;
