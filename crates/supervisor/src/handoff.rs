// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reporting startup status to the launcher.
//!
//! The launcher leaves one end of a datagram socket pair in our
//! environment (`BUREAUCRAT_LAUNCH_PIPE`) and blocks on it until we report
//! whether the broker came up.

use std::os::fd::FromRawFd;
use std::os::unix::net::UnixDatagram;

use nix::fcntl::{fcntl, FcntlArg, FdFlag};

use tectonic_core::env;

/// The hand-off socket inherited from the launcher, if any.
///
/// Standalone supervisor runs (no launcher) simply have nothing to report
/// to.
pub struct LaunchPipe(Option<UnixDatagram>);

impl LaunchPipe {
    pub fn from_env() -> Self {
        match env::launch_pipe_fd() {
            Some(fd) => {
                // Our children must not inherit the hand-off socket.
                let _ = fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC));
                // SAFETY: the launcher passed ownership of this inherited
                // descriptor through the environment contract; nobody else
                // in this process touches it.
                Self(Some(unsafe { UnixDatagram::from_raw_fd(fd) }))
            }
            None => Self(None),
        }
    }

    /// Report startup success (`'0'`) or failure (`'1'`), consuming the
    /// socket. Best-effort: a vanished launcher is not our problem.
    pub fn report(self, ok: bool) {
        if let Some(socket) = self.0 {
            let byte: &[u8] = if ok { b"0" } else { b"1" };
            if let Err(e) = socket.send(byte) {
                tracing::warn!(error = %e, "could not report startup status to launcher");
            }
        }
    }
}
