// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known filesystem locations shared by the whole process tree.
//!
//! These are defaults, not singletons: every component takes the paths it
//! uses as explicit configuration and only falls back to these constants.

use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};

/// Default path of the broker's control socket.
pub const CONTROL_SOCKET_PATH: &str = "bureaucrat.sock";

/// Default path of the session-group id file written by the launcher.
pub const PGROUP_PATH: &str = "tectonic.pgroup";

/// The log directory layout under a configurable root.
///
/// Each long-lived process writes into its own subdirectory
/// (`proctor/`, `bureaucrat/`, `workers/`), with `stdout` and `stderr`
/// files inside. Rotated files carry `.1 ... .N` suffixes next to the
/// live file.
#[derive(Debug, Clone)]
pub struct LogTree {
    root: PathBuf,
}

impl LogTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Supervisor log directory.
    pub fn proctor(&self) -> PathBuf {
        self.root.join("proctor")
    }

    /// Broker log directory.
    pub fn bureaucrat(&self) -> PathBuf {
        self.root.join("bureaucrat")
    }

    /// Shared worker log directory.
    pub fn workers(&self) -> PathBuf {
        self.root.join("workers")
    }

    /// Create the three per-role directories, verifying each is usable.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [self.proctor(), self.bureaucrat(), self.workers()] {
            ensure_directory(&dir)?;
        }
        Ok(())
    }
}

/// Create `path` if missing and verify read, write, and list access.
fn ensure_directory(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path)?;
    }
    access(path, AccessFlags::R_OK | AccessFlags::W_OK | AccessFlags::X_OK).map_err(|errno| {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!(
                "insufficient permissions for log dir {} (need read, write, and list): {errno}",
                path.display()
            ),
        )
    })
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
