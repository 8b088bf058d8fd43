// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing tests: well-formed frames and every rejection path.

use std::io::Cursor;

use yare::parameterized;

use super::*;
use crate::ProtocolError;

#[test]
fn roundtrip() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, b"hello world").unwrap();

    assert_eq!(buffer, b"11:hello world,");
    assert_eq!(read_frame(&mut Cursor::new(buffer)).unwrap(), b"hello world");
}

#[test]
fn empty_payload_roundtrips() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, b"").unwrap();

    assert_eq!(buffer, b"0:,");
    assert_eq!(read_frame(&mut Cursor::new(buffer)).unwrap(), b"");
}

#[test]
fn consecutive_frames_are_independent() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, b"one").unwrap();
    write_frame(&mut buffer, b"two").unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_frame(&mut cursor).unwrap(), b"one");
    assert_eq!(read_frame(&mut cursor).unwrap(), b"two");
}

#[parameterized(
    no_digits = { b":abc,".to_vec() },
    non_digit_prefix = { b"3a:abc,".to_vec() },
    negative_length = { b"-3:abc,".to_vec() },
)]
fn bad_length_prefix_is_malformed(frame: Vec<u8>) {
    let err = read_frame(&mut Cursor::new(frame)).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)), "got {err:?}");
}

#[test]
fn missing_trailing_comma_is_malformed() {
    let err = read_frame(&mut Cursor::new(b"3:abc;".to_vec())).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn oversized_length_prefix_is_rejected() {
    let mut frame = vec![b'1'; MAX_LENGTH_DIGITS + 1];
    frame.extend_from_slice(b":x,");

    let err = read_frame(&mut Cursor::new(frame)).unwrap_err();
    assert!(matches!(err, ProtocolError::LengthOverflow));
}

#[parameterized(
    empty_stream = { Vec::new() },
    truncated_prefix = { b"12".to_vec() },
    truncated_payload = { b"10:abc".to_vec() },
    missing_trailer = { b"3:abc".to_vec() },
)]
fn eof_mid_frame_is_connection_closed(frame: Vec<u8>) {
    let err = read_frame(&mut Cursor::new(frame)).unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed), "got {err:?}");
}
