// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The parent's hand-off state machine.
//!
//! Two states: first the session-group id arrives over the hand-off
//! socket, then the startup status byte. Until the group id is known, a
//! readable SIGCHLD pipe means the child died prematurely. Every wait is
//! bounded by the configured timeout, and every failure path kills what
//! was started — by group when the group is known, by pid before that.

use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

/// What a bounded wait observed.
enum Readiness {
    /// The hand-off socket has a datagram.
    Socket,
    /// The SIGCHLD pipe fired (and the socket was silent).
    ChildDied,
    Timeout,
}

/// Run the hand-off: returns the launcher's exit code.
pub fn wait_for_tree(
    socket: &UnixDatagram,
    child_pid: Pid,
    sigchld_fd: RawFd,
    timeout: Duration,
    log_dir: &Path,
) -> i32 {
    // State 1: want the session-group id.
    let process_group = match wait_readable(socket.as_raw_fd(), Some(sigchld_fd), timeout) {
        Ok(Readiness::Socket) => match recv_number(socket) {
            Some(sid) => Pid::from_raw(sid),
            None => {
                eprintln!("Could not communicate with proctor and bureaucrat.");
                let _ = kill(child_pid, Signal::SIGKILL);
                return 1;
            }
        },
        Ok(Readiness::ChildDied) => {
            eprintln!(
                "Proctor and/or bureaucrat died unexpectedly during daemonization. \
                 Check logs in: {}.",
                log_dir.display()
            );
            let _ = kill(child_pid, Signal::SIGKILL);
            return 1;
        }
        Ok(Readiness::Timeout) => {
            eprintln!(
                "Proctor and/or bureaucrat not successfully started before timeout ({}s) \
                 expired. Check logs in: {}.",
                timeout.as_secs(),
                log_dir.display()
            );
            let _ = kill(child_pid, Signal::SIGKILL);
            return 1;
        }
        Err(e) => {
            eprintln!("Could not communicate with proctor and bureaucrat: {e}.");
            let _ = kill(child_pid, Signal::SIGKILL);
            return 1;
        }
    };

    // State 2: the intermediate child exits as part of detaching, so the
    // SIGCHLD pipe no longer means failure; stop watching it.
    match wait_readable(socket.as_raw_fd(), None, timeout) {
        Ok(Readiness::Socket) => {
            let mut status = [0u8; 1024];
            match socket.recv(&mut status) {
                Ok(n) if n > 0 && status[0] == b'0' => 0,
                _ => {
                    eprintln!(
                        "Proctor or bureaucrat did not start successfully. Check logs in: {}.",
                        log_dir.display()
                    );
                    let _ = killpg(process_group, Signal::SIGKILL);
                    1
                }
            }
        }
        Ok(Readiness::Timeout) | Ok(Readiness::ChildDied) => {
            eprintln!(
                "Proctor and/or bureaucrat not successfully started before timeout ({}s) \
                 expired. Check logs in: {}.",
                timeout.as_secs(),
                log_dir.display()
            );
            let _ = killpg(process_group, Signal::SIGKILL);
            1
        }
        Err(e) => {
            eprintln!("Could not communicate with proctor and bureaucrat: {e}.");
            let _ = killpg(process_group, Signal::SIGKILL);
            1
        }
    }
}

/// Bounded poll over the hand-off socket and (in state 1) the SIGCHLD
/// pipe, retrying on `EINTR` against the same deadline. The socket wins
/// when both are readable: a datagram that arrived before the child's
/// planned exit is progress, not death.
fn wait_readable(
    socket_fd: RawFd,
    sigchld_fd: Option<RawFd>,
    timeout: Duration,
) -> Result<Readiness, Errno> {
    let deadline = Instant::now() + timeout;
    loop {
        // SAFETY: both descriptors outlive this scope; poll only borrows.
        let socket = unsafe { BorrowedFd::borrow_raw(socket_fd) };
        let mut fds = vec![PollFd::new(socket, PollFlags::POLLIN)];
        let sigchld = sigchld_fd.map(|fd| unsafe { BorrowedFd::borrow_raw(fd) });
        if let Some(fd) = sigchld {
            fds.push(PollFd::new(fd, PollFlags::POLLIN));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let millis = i32::try_from(remaining.as_millis()).unwrap_or(i32::MAX);
        let poll_timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX);
        match poll(&mut fds, poll_timeout) {
            Ok(0) => return Ok(Readiness::Timeout),
            Ok(_) => {
                let socket_ready = fds[0]
                    .revents()
                    .is_some_and(|revents| revents.intersects(PollFlags::POLLIN));
                if socket_ready {
                    return Ok(Readiness::Socket);
                }
                return Ok(Readiness::ChildDied);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Receive one ASCII decimal datagram.
fn recv_number(socket: &UnixDatagram) -> Option<i32> {
    let mut buf = [0u8; 1024];
    let n = socket.recv(&mut buf).ok()?;
    std::str::from_utf8(&buf[..n]).ok()?.parse().ok()
}

#[cfg(test)]
#[path = "waitfor_tests.rs"]
mod tests;
