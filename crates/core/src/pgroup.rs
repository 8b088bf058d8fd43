// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session-group id file.
//!
//! The launcher records the tree's session group here so a later
//! invocation can signal the whole tree at once. The content is a bare
//! ASCII decimal; anything else is rejected rather than guessed at.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Cap on file content read when validating.
const MAX_LEN: u64 = 1024;

#[derive(Debug, Error)]
pub enum PgroupError {
    #[error("process group file {0} not found")]
    Missing(PathBuf),

    #[error("process group file {0} does not contain an integer")]
    Malformed(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Record the session group id.
pub fn write(path: &Path, pgrp: i32) -> io::Result<()> {
    fs::write(path, pgrp.to_string())
}

/// Read and validate the session group id.
pub fn read(path: &Path) -> Result<i32, PgroupError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PgroupError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if meta.len() == 0 || meta.len() > MAX_LEN {
        return Err(PgroupError::Malformed(path.to_path_buf()));
    }

    let raw = fs::read(path)?;
    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(PgroupError::Malformed(path.to_path_buf()));
    }
    String::from_utf8_lossy(&raw)
        .parse()
        .map_err(|_| PgroupError::Malformed(path.to_path_buf()))
}

#[cfg(test)]
#[path = "pgroup_tests.rs"]
mod tests;
