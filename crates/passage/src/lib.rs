// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Descriptor passing over Unix stream sockets.
//!
//! After the typed control response, the sender transmits one message whose
//! payload is a carrier record describing the transferred object
//! (`{description: [field, ...], filenos: [fd, ...]}`) and whose ancillary
//! control data carries the descriptors themselves (`SCM_RIGHTS`). The
//! kernel requires at least one payload byte to accompany ancillary data;
//! the carrier doubles as that payload. The receiver pairs field names with
//! the received descriptors in order — the `filenos` are the sender's fd
//! numbers and are informational only.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use nix::cmsg_space;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name used when a single unnamed socket is transferred.
pub const SOCKET_FIELD: &str = "socket";

/// Upper bound on descriptors per transfer.
pub const MAX_FDS: usize = 8;

/// Buffer size for the carrier payload.
const CARRIER_CAPACITY: usize = 4096;

/// Carrier payload sent alongside the descriptors.
#[derive(Debug, Serialize, Deserialize)]
struct Carrier {
    description: Vec<String>,
    filenos: Vec<RawFd>,
}

#[derive(Debug, Error)]
pub enum PassageError {
    #[error("carrier payload malformed: {0}")]
    Carrier(#[from] serde_json::Error),

    #[error("connection closed before any descriptor arrived")]
    ConnectionClosed,

    #[error("carrier names {expected} descriptors, received {received}")]
    CountMismatch { expected: usize, received: usize },

    #[error("cannot transfer {0} descriptors in one message")]
    TooMany(usize),

    #[error(transparent)]
    Os(#[from] nix::Error),
}

/// Send `fds` over `stream`, described field-by-field by `description`.
///
/// `description` and `fds` must pair up in order.
pub fn transfer(
    stream: &UnixStream,
    description: &[&str],
    fds: &[RawFd],
) -> Result<(), PassageError> {
    if description.len() != fds.len() {
        return Err(PassageError::CountMismatch {
            expected: description.len(),
            received: fds.len(),
        });
    }
    if fds.is_empty() || fds.len() > MAX_FDS {
        return Err(PassageError::TooMany(fds.len()));
    }

    let carrier = Carrier {
        description: description.iter().map(|field| (*field).to_string()).collect(),
        filenos: fds.to_vec(),
    };
    let payload = serde_json::to_vec(&carrier)?;

    let iov = [IoSlice::new(&payload)];
    let cmsgs = [ControlMessage::ScmRights(fds)];
    sendmsg::<()>(stream.as_raw_fd(), &iov, &cmsgs, MsgFlags::empty(), None)?;
    Ok(())
}

/// Receive one transfer, pairing carrier field names with descriptors.
///
/// Received descriptors are opened close-on-exec.
pub fn obtain(stream: &UnixStream) -> Result<Vec<(String, OwnedFd)>, PassageError> {
    let mut payload = [0u8; CARRIER_CAPACITY];
    let mut cmsg_buffer = cmsg_space!([RawFd; MAX_FDS]);

    let (bytes, fds) = {
        let mut iov = [IoSliceMut::new(&mut payload)];
        let msg = recvmsg::<()>(
            stream.as_raw_fd(),
            &mut iov,
            Some(&mut cmsg_buffer),
            MsgFlags::MSG_CMSG_CLOEXEC,
        )?;
        let mut fds: Vec<OwnedFd> = Vec::new();
        for cmsg in msg.cmsgs()? {
            if let ControlMessageOwned::ScmRights(received) = cmsg {
                // SAFETY: the kernel just installed these descriptors into
                // this process for us; nothing else owns them.
                fds.extend(received.into_iter().map(|fd| unsafe { OwnedFd::from_raw_fd(fd) }));
            }
        }
        (msg.bytes, fds)
    };

    if bytes == 0 && fds.is_empty() {
        return Err(PassageError::ConnectionClosed);
    }

    let carrier: Carrier = serde_json::from_slice(&payload[..bytes])?;
    if carrier.description.len() != fds.len() {
        return Err(PassageError::CountMismatch {
            expected: carrier.description.len(),
            received: fds.len(),
        });
    }
    Ok(carrier.description.into_iter().zip(fds).collect())
}

/// Receive a transfer expected to carry exactly one descriptor.
pub fn obtain_single(stream: &UnixStream) -> Result<OwnedFd, PassageError> {
    let mut fields = obtain(stream)?;
    if fields.len() != 1 {
        return Err(PassageError::CountMismatch { expected: 1, received: fields.len() });
    }
    let (_, fd) = fields.swap_remove(0);
    Ok(fd)
}

#[cfg(test)]
#[path = "passage_tests.rs"]
mod tests;
