// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control messages exchanged with the broker.
//!
//! `Want…` requests name a shared resource; the broker answers with the
//! matching `Have…` response and then transfers the descriptor(s) out of
//! band. `Failure` echoes the request the broker could not satisfy.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::netstring::{read_frame, write_frame};
use crate::ProtocolError;

/// A control message. The JSON tag key is the reserved `__name__` field.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__name__")]
pub enum Message {
    /// Request a shared bound, listening TCP socket.
    WantTCPListener { host: String, port: u16, listen: i32 },
    HaveTCPListener { host: String, port: u16 },

    /// Request this peer's end of a channel jointly owned with `partner`.
    WantChannel { identity: String, partner: String },
    HaveChannel { identity: String, partner: String },

    /// Request the current shared worker stdout/stderr descriptors.
    WantWorkerStandardPair { ignored: bool },
    HaveWorkerStandardPair { ignored: bool },

    /// The broker could not satisfy `request_message`.
    Failure { request_message: Value },
}

/// Envelope adding the sender pid to a serialized [`Message`].
#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(flatten)]
    message: Message,
    __pid__: u32,
}

/// Serialize a message to its JSON payload, stamping the sender pid.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let envelope = Envelope { message: message.clone(), __pid__: std::process::id() };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Parse a JSON payload into a message and the sender's pid.
pub fn decode(payload: &[u8]) -> Result<(Message, u32), ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    Ok((envelope.message, envelope.__pid__))
}

/// Write one framed message.
pub fn send_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), ProtocolError> {
    write_frame(writer, &encode(message)?)
}

/// Read one framed message, returning it with the sender's pid.
pub fn read_message<R: Read>(reader: &mut R) -> Result<(Message, u32), ProtocolError> {
    decode(&read_frame(reader)?)
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
