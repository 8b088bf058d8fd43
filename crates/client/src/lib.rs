// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side client for the broker.
//!
//! Workers call into this crate at startup to obtain their shared listening
//! socket, their channel to a named peer, and the shared stdout/stderr
//! descriptors, and to run the background maintenance threads (stdio
//! refresh, heartbeats) the supervisor expects of a cooperating worker.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod health;
mod refresh;
mod requests;

pub use refresh::{start_heartbeat_thread, start_std_refresh_thread, HEARTBEAT_INTERVAL};
pub use requests::{
    await_ready, request_channel, request_tcp_listener, request_worker_std_pair, StandardPair,
};

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use tectonic_passage::PassageError;
use tectonic_wire::{Message, ProtocolError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("broker socket {0} did not appear within {1:?}")]
    NotReady(PathBuf, Duration),

    /// The broker answered `Failure` or closed the connection without a
    /// `Have…` response; the two are equivalent to the client.
    #[error("broker refused the request")]
    Refused,

    #[error("response does not answer the request: {0:?}")]
    Mismatch(Message),

    #[error("transfer did not carry the expected fields")]
    MissingFields,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Passage(#[from] PassageError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
