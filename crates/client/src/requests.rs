// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource requests against the broker's control socket.
//!
//! Each request is one short-lived connection: send `Want…`, read the typed
//! response, then receive the descriptor transfer. The `Have…` fields are
//! checked against the request as a hand-off sanity check.

use std::fs;
use std::net::TcpListener;
use std::os::fd::OwnedFd;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::unistd::dup2;

use tectonic_passage as passage;
use tectonic_wire::{read_message, send_message, Message, ProtocolError};

use crate::ClientError;

/// How long a connected request waits for the broker to answer.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll step while waiting for the control socket to appear.
const READY_POLL: Duration = Duration::from_millis(100);

/// Block until the control socket exists and is a socket, or time out.
pub fn await_ready(path: &Path, timeout: Duration) -> Result<(), ClientError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(meta) = fs::metadata(path) {
            if meta.file_type().is_socket() {
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(ClientError::NotReady(path.to_path_buf(), timeout));
        }
        std::thread::sleep(READY_POLL);
    }
}

/// Connect, send the request, and read the typed response.
///
/// A `Failure` response or a connection closed without a response both map
/// to [`ClientError::Refused`].
fn exchange(path: &Path, request: &Message) -> Result<(Message, UnixStream), ClientError> {
    let mut stream = UnixStream::connect(path)?;
    stream.set_read_timeout(Some(EXCHANGE_TIMEOUT))?;
    stream.set_write_timeout(Some(EXCHANGE_TIMEOUT))?;

    send_message(&mut stream, request)?;
    let (response, _pid) = match read_message(&mut stream) {
        Ok(answer) => answer,
        Err(ProtocolError::ConnectionClosed) => return Err(ClientError::Refused),
        Err(e) => return Err(e.into()),
    };
    if matches!(response, Message::Failure { .. }) {
        return Err(ClientError::Refused);
    }
    Ok((response, stream))
}

/// Obtain the shared listening socket for `(host, port, listen)`.
///
/// Repeated requests for the same triple return descriptors for the same
/// underlying kernel socket.
pub fn request_tcp_listener(
    host: &str,
    port: u16,
    listen: i32,
    path: &Path,
) -> Result<TcpListener, ClientError> {
    let request =
        Message::WantTCPListener { host: host.to_string(), port, listen };
    let (response, stream) = exchange(path, &request)?;
    match response {
        Message::HaveTCPListener { host: have_host, port: have_port }
            if have_host == host && have_port == port => {}
        other => return Err(ClientError::Mismatch(other)),
    }
    let fd = passage::obtain_single(&stream)?;
    Ok(TcpListener::from(fd))
}

/// Obtain this peer's end of the channel shared with `partner`.
///
/// Either peer may request first; the broker creates the pair on the first
/// request and hands the other end to the partner.
pub fn request_channel(
    identity: &str,
    partner: &str,
    path: &Path,
) -> Result<UnixStream, ClientError> {
    let request =
        Message::WantChannel { identity: identity.to_string(), partner: partner.to_string() };
    let (response, stream) = exchange(path, &request)?;
    match response {
        Message::HaveChannel { identity: have_identity, partner: have_partner }
            if have_identity == identity && have_partner == partner => {}
        other => return Err(ClientError::Mismatch(other)),
    }
    let fd = passage::obtain_single(&stream)?;
    Ok(UnixStream::from(fd))
}

/// The shared worker stdout/stderr descriptors.
#[derive(Debug)]
pub struct StandardPair {
    pub stdout: OwnedFd,
    pub stderr: OwnedFd,
}

impl StandardPair {
    /// Move the pair over this process's fds 1 and 2, closing the received
    /// duplicates.
    pub fn install(self) -> std::io::Result<()> {
        use std::os::fd::AsRawFd;
        dup2(self.stdout.as_raw_fd(), 1)?;
        dup2(self.stderr.as_raw_fd(), 2)?;
        Ok(())
    }
}

/// Obtain the current shared stdout/stderr log descriptors.
pub fn request_worker_std_pair(path: &Path) -> Result<StandardPair, ClientError> {
    let request = Message::WantWorkerStandardPair { ignored: true };
    let (response, stream) = exchange(path, &request)?;
    if !matches!(response, Message::HaveWorkerStandardPair { .. }) {
        return Err(ClientError::Mismatch(response));
    }

    let mut stdout = None;
    let mut stderr = None;
    for (field, fd) in passage::obtain(&stream)? {
        match field.as_str() {
            "stdout" => stdout = Some(fd),
            "stderr" => stderr = Some(fd),
            _ => {}
        }
    }
    match (stdout, stderr) {
        (Some(stdout), Some(stderr)) => Ok(StandardPair { stdout, stderr }),
        _ => Err(ClientError::MissingFields),
    }
}

#[cfg(test)]
#[path = "requests_tests.rs"]
mod tests;
