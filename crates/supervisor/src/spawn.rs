// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process spawning: the broker and the workers.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::process::{Command, Stdio};

use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};

use tectonic_client::StandardPair;
use tectonic_core::{env, open_log_fd, LogTree};

/// A freshly spawned worker: its pid and the supervisor's end of its
/// health pipe.
#[derive(Debug)]
pub struct SpawnedWorker {
    pub pid: i32,
    pub heartbeat: OwnedFd,
}

/// Spawn the broker child with stdio appended to its log directory.
///
/// The broker rotates those descriptors in place itself once running.
pub fn spawn_broker(log_tree: &LogTree) -> io::Result<i32> {
    let dir = log_tree.bureaucrat();
    let stdout = open_log_fd(&dir.join("stdout"))?;
    let stderr = open_log_fd(&dir.join("stderr"))?;

    let binary = env::broker_binary();
    let child = Command::new(&binary)
        .arg("--log-dir")
        .arg(log_tree.root())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()?;

    tracing::info!(pid = child.id(), binary = %binary.display(), "broker spawned");
    Ok(child.id() as i32)
}

/// Spawn one worker: broker-provided stdio, null stdin, and a fresh health
/// pipe whose write end the worker inherits by fd number.
pub fn spawn_worker(invocation: &[String], pair: StandardPair) -> io::Result<SpawnedWorker> {
    let (program, args) = invocation
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty worker invocation"))?;

    let (read_end, write_end) = heartbeat_pipe()?;
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(pair.stdout))
        .stderr(Stdio::from(pair.stderr))
        .env(env::HEALTH_PIPE, write_end.as_raw_fd().to_string())
        .spawn()?;
    // The worker holds the only surviving write end now; EOF on the read
    // end therefore tracks the worker itself.
    drop(write_end);

    tracing::info!(pid = child.id(), program = %program, "worker spawned");
    Ok(SpawnedWorker { pid: child.id() as i32, heartbeat: read_end })
}

/// A pipe whose read end stays with the supervisor (nonblocking,
/// close-on-exec) and whose write end is inherited across the exec.
fn heartbeat_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let (read_end, write_end) = nix::unistd::pipe()?;
    fcntl(read_end.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))?;
    fcntl(read_end.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok((read_end, write_end))
}
