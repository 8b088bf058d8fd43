// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control protocol for broker communication.
//!
//! Wire format: netstring framing (`LEN:PAYLOAD,`, ASCII decimal length)
//! around a JSON payload. The payload carries the message tag under the
//! reserved `__name__` key and the sender's pid under `__pid__`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod message;
mod netstring;

pub use message::{decode, encode, read_message, send_message, Message};
pub use netstring::{read_frame, write_frame, MAX_LENGTH_DIGITS};

use std::io;

use thiserror::Error;

/// Errors from framing, encoding, or decoding control messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("netstring length prefix exceeds {MAX_LENGTH_DIGITS} digits")]
    LengthOverflow,

    #[error("malformed netstring: {0}")]
    Malformed(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod property_tests;
