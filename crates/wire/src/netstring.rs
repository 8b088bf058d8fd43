// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Netstring framing: `LEN:PAYLOAD,` with an ASCII decimal length.

use std::io::{Read, Write};

use crate::ProtocolError;

/// Cap on the number of digits in a length prefix.
pub const MAX_LENGTH_DIGITS: usize = 1024;

/// Write one framed payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    write!(writer, "{}:", payload.len())?;
    writer.write_all(payload)?;
    writer.write_all(b",")?;
    writer.flush()?;
    Ok(())
}

/// Read one framed payload.
///
/// Rejects length prefixes longer than [`MAX_LENGTH_DIGITS`], non-digit
/// prefix bytes, and a missing trailing comma. EOF anywhere inside a frame
/// is [`ProtocolError::ConnectionClosed`].
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut length: u64 = 0;
    let mut digits = 0usize;
    loop {
        match read_byte(reader)? {
            byte @ b'0'..=b'9' => {
                digits += 1;
                if digits > MAX_LENGTH_DIGITS {
                    return Err(ProtocolError::LengthOverflow);
                }
                length = length
                    .checked_mul(10)
                    .and_then(|l| l.checked_add(u64::from(byte - b'0')))
                    .ok_or(ProtocolError::LengthOverflow)?;
            }
            b':' if digits > 0 => break,
            _ => return Err(ProtocolError::Malformed("length prefix")),
        }
    }

    let mut payload = Vec::new();
    reader.by_ref().take(length).read_to_end(&mut payload)?;
    if (payload.len() as u64) < length {
        return Err(ProtocolError::ConnectionClosed);
    }

    if read_byte(reader)? != b',' {
        return Err(ProtocolError::Malformed("missing trailing comma"));
    }
    Ok(payload)
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8, ProtocolError> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(buf[0])
}

#[cfg(test)]
#[path = "netstring_tests.rs"]
mod tests;
