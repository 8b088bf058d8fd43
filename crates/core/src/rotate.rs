// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log rotation that preserves the identity of well-known descriptors.
//!
//! Rotation renames the archive chain (`log.1` becomes `log.2`, the live
//! `log` becomes `log.1`) and opens a fresh file at the live path. When a
//! rotation is bound to a descriptor such as stdout's fd 1, the fresh
//! descriptor is `dup2`ed over the bound one, so writers holding that fd
//! keep addressing the live file without ever learning about the swap.
//! `O_APPEND` keeps each write syscall atomically positioned, and the
//! `dup2` replacement is itself atomic: a concurrent write lands in either
//! the old open file or the new one.

use std::fs;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nix::unistd::dup2;

/// Default rotation threshold in bytes (2^32).
pub const DEFAULT_MAX_SIZE: u64 = 1 << 32;

/// Default number of archived iterations.
pub const DEFAULT_ITERATIONS: u32 = 8;

/// Mode for created log files.
pub const LOG_MODE: u32 = 0o644;

/// Open a log file for appending, creating it with [`LOG_MODE`] if absent.
pub fn open_log_fd(path: &Path) -> io::Result<OwnedFd> {
    let file = fs::OpenOptions::new().append(true).create(true).mode(LOG_MODE).open(path)?;
    Ok(OwnedFd::from(file))
}

/// Rename the archive chain and move `path` aside once it exceeds `max_size`.
///
/// Returns whether a rotation happened. A missing live file is not an error;
/// there is simply nothing to rotate yet.
pub fn rotate_path(path: &Path, max_size: u64, iterations: u32) -> io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_size {
        return Ok(false);
    }

    for target_num in (2..=iterations).rev() {
        let source = numbered(path, target_num - 1);
        if source.exists() {
            fs::rename(&source, numbered(path, target_num))?;
        }
    }
    fs::rename(path, numbered(path, 1))?;
    Ok(true)
}

fn numbered(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Rotates one log file, optionally keeping a bound descriptor pointed at
/// the live file across rotations.
#[derive(Debug)]
pub struct LogRotation {
    path: PathBuf,
    bound_fd: Option<RawFd>,
    max_size: u64,
    iterations: u32,
    mode: u32,
}

impl LogRotation {
    /// Track `path` with the default size threshold and archive depth.
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::with_limits(path, DEFAULT_MAX_SIZE, DEFAULT_ITERATIONS)
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_size: u64, iterations: u32) -> io::Result<Self> {
        let rotation = Self {
            path: path.into(),
            bound_fd: None,
            max_size,
            iterations,
            mode: LOG_MODE,
        };
        rotation.ensure_file()?;
        Ok(rotation)
    }

    /// Bind a well-known descriptor (typically 1 or 2). Every reopen moves
    /// the fresh descriptor onto it, so its integer value never changes.
    pub fn bind_fd(mut self, fd: RawFd) -> Self {
        self.bound_fd = Some(fd);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the live file exists and carries the expected mode.
    fn ensure_file(&self) -> io::Result<()> {
        if !self.path.is_file() {
            drop(open_log_fd(&self.path)?);
        }
        let current = fs::metadata(&self.path)?.permissions().mode() & 0o7777;
        if current != self.mode {
            fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode))?;
        }
        Ok(())
    }

    /// Open a fresh descriptor for the live file.
    ///
    /// With a bound fd the fresh descriptor is moved onto it and `None` is
    /// returned; the bound fd now addresses the live file. Without one, the
    /// caller receives the fresh descriptor.
    pub fn reopen(&self) -> io::Result<Option<OwnedFd>> {
        self.ensure_file()?;
        let fresh = open_log_fd(&self.path)?;
        match self.bound_fd {
            Some(bound) => {
                dup2(fresh.as_raw_fd(), bound).map_err(io::Error::from)?;
                Ok(None)
            }
            None => Ok(Some(fresh)),
        }
    }

    /// One rotation tick: rotate if the live file outgrew the threshold and
    /// reopen it. Returns `Ok(None)` when nothing rotated or when the fresh
    /// descriptor was rebound in place.
    pub fn rotate(&self) -> io::Result<Option<OwnedFd>> {
        if !rotate_path(&self.path, self.max_size, self.iterations)? {
            return Ok(None);
        }
        tracing::debug!(path = %self.path.display(), "rotated log file");
        self.reopen()
    }
}

/// Spawn a background thread ticking `rotations` on `interval` forever.
///
/// Each rotation is reopened first, so bound descriptors address the live
/// files before the first tick. This is how the daemons keep their own
/// stdout and stderr (fds 1 and 2) rotating in place. The interval gets
/// sub-second jitter so a fleet of daemons doesn't tick in lockstep.
pub fn start_rotation_thread(
    rotations: Vec<LogRotation>,
    interval: std::time::Duration,
) -> io::Result<std::thread::JoinHandle<()>> {
    use rand::Rng;
    let interval =
        interval + std::time::Duration::from_millis(rand::rng().random_range(0..1000));
    for rotation in &rotations {
        drop(rotation.reopen()?);
    }
    std::thread::Builder::new().name("log-rotation".to_string()).spawn(move || loop {
        for rotation in &rotations {
            if let Err(e) = rotation.rotate() {
                tracing::error!(path = %rotation.path().display(), error = %e, "rotation failed");
            }
        }
        std::thread::sleep(interval);
    })
}

#[cfg(test)]
#[path = "rotate_tests.rs"]
mod tests;
