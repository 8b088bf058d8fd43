// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker self-checks: orphaning and resource ceilings.
//!
//! A worker that trips one of these exits deliberately so the supervisor
//! respawns it in a clean state, instead of limping on toward an OOM kill
//! or descriptor exhaustion mid-request.

use nix::sys::resource::{getrlimit, Resource};
use nix::unistd::{getppid, Pid};

/// Raised descriptor-count alarm this many fds before `RLIMIT_NOFILE`.
const DEFAULT_FD_HEADROOM: u64 = 32;

/// True when this process has been reparented to init: the supervisor is
/// gone and nobody will reap or restart us.
pub fn is_orphaned() -> bool {
    getppid() == Pid::from_raw(1)
}

/// Resident set size in bytes, if procfs is readable.
pub fn rss_bytes() -> Option<u64> {
    let statm = procfs::process::Process::myself().ok()?.statm().ok()?;
    Some(statm.resident * procfs::page_size())
}

/// Number of open descriptors in this process.
pub fn open_fd_count() -> Option<u64> {
    let count = procfs::process::Process::myself().ok()?.fd_count().ok()?;
    Some(count as u64)
}

/// Soft `RLIMIT_NOFILE`.
pub fn nofile_limit() -> Option<u64> {
    getrlimit(Resource::RLIMIT_NOFILE).ok().map(|(soft, _hard)| soft)
}

/// Ceilings a worker checks between units of work.
#[derive(Debug, Clone)]
pub struct ResourceChecks {
    /// Exit once RSS exceeds this many bytes. `None` disables the check.
    pub max_rss_bytes: Option<u64>,
    /// Exit once open descriptors come within this many of `RLIMIT_NOFILE`.
    pub fd_headroom: u64,
}

impl Default for ResourceChecks {
    fn default() -> Self {
        Self { max_rss_bytes: None, fd_headroom: DEFAULT_FD_HEADROOM }
    }
}

impl ResourceChecks {
    /// True when the process should exit to be respawned cleanly.
    pub fn breached(&self) -> bool {
        if is_orphaned() {
            tracing::warn!("parent is init, treating self as orphaned");
            return true;
        }
        if let (Some(cap), Some(rss)) = (self.max_rss_bytes, rss_bytes()) {
            if rss > cap {
                tracing::warn!(rss, cap, "resident set size over the cap");
                return true;
            }
        }
        if let (Some(open), Some(limit)) = (open_fd_count(), nofile_limit()) {
            if limit != nix::libc::RLIM_INFINITY && open.saturating_add(self.fd_headroom) >= limit
            {
                tracing::warn!(open, limit, "descriptor count approaching RLIMIT_NOFILE");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
