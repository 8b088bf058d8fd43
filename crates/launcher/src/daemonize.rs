// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detaching the tree from the terminal.
//!
//! The classic sequence: fork, and in the intermediate child `setsid`,
//! `umask(0)`, stdin from `/dev/null`, stdout/stderr onto the proctor
//! logs, then spawn the supervisor and exit — the second detach. The
//! parent meanwhile runs the hand-off state machine and reports success
//! or failure on its own stderr.

use std::fs;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{dup2, fork, getsid, setsid, ForkResult};

use tectonic_core::rotate::LogRotation;
use tectonic_core::{env, pgroup, LogTree};

use crate::waitfor::wait_for_tree;
use crate::LaunchError;

/// Launcher configuration.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub log_dir: PathBuf,
    pub timeout: Duration,
    pub pgroup_file: PathBuf,
    /// Arguments forwarded to the supervisor (worker invocation, count).
    pub supervisor_args: Vec<String>,
}

/// Start the tree and block until it is verifiably up or dead.
/// Returns the launcher's exit code.
pub fn run(config: &LaunchConfig) -> Result<i32, LaunchError> {
    LogTree::new(&config.log_dir).ensure()?;

    let (parent_socket, child_socket) = UnixDatagram::pair()?;
    let (sigchld_read, sigchld_write) = nix::unistd::pipe()?;
    // The handler end must never block inside a signal handler.
    fcntl(sigchld_write.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))?;
    let sig_id =
        signal_hook::low_level::pipe::register(signal_hook::consts::SIGCHLD, sigchld_write)
            .map_err(LaunchError::SignalPipe)?;

    // SAFETY: still single-threaded; the child runs straight to exec/exit
    // without touching shared state.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => {
            drop(child_socket);
            let code = wait_for_tree(
                &parent_socket,
                child,
                sigchld_read.as_raw_fd(),
                config.timeout,
                &config.log_dir,
            );
            signal_hook::low_level::unregister(sig_id);
            Ok(code)
        }
        ForkResult::Child => {
            // The registration was inherited; this process must not treat
            // its own children's exits as launcher state.
            signal_hook::low_level::unregister(sig_id);
            drop(parent_socket);
            drop(sigchld_read);

            let code = match detach_and_spawn(config, &child_socket) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Could not start the proctor: {e}.");
                    let _ = child_socket.send(b"1");
                    1
                }
            };
            std::process::exit(code);
        }
    }
}

/// The intermediate child: become a session leader, record the group,
/// spawn the supervisor, and get out of the way.
fn detach_and_spawn(config: &LaunchConfig, child_socket: &UnixDatagram) -> Result<(), LaunchError> {
    let tree = LogTree::new(&config.log_dir);

    let devnull = fs::File::open("/dev/null")?;
    dup2(devnull.as_raw_fd(), 0)?;

    // Our stdout and stderr go to the proctor logs now; the supervisor
    // inherits them and keeps them rotating.
    let proctor_logs = tree.proctor();
    LogRotation::new(proctor_logs.join("stdout"))?.bind_fd(1).reopen()?;
    LogRotation::new(proctor_logs.join("stderr"))?.bind_fd(2).reopen()?;

    setsid()?;
    umask(Mode::empty());

    let sid = getsid(None)?.as_raw();
    pgroup::write(&config.pgroup_file, sid)?;
    child_socket.send(sid.to_string().as_bytes())?;

    // The supervisor inherits the hand-off socket by fd number.
    let socket_fd = child_socket.as_raw_fd();
    fcntl(socket_fd, FcntlArg::F_SETFD(FdFlag::empty()))?;

    let mut supervisor = Command::new(env::supervisor_binary())
        .arg("--log-dir")
        .arg(&config.log_dir)
        .args(&config.supervisor_args)
        .env(env::LAUNCH_PIPE, socket_fd.to_string())
        .spawn()?;

    if supervisor.try_wait()?.is_some() {
        return Err(LaunchError::SupervisorDead);
    }
    tracing::debug!(pid = supervisor.id(), "supervisor spawned, detaching");
    Ok(())
}
