// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the process tree.

use std::os::fd::RawFd;
use std::path::PathBuf;

/// Carries the hand-off socket fd across the exec into the supervisor.
pub const LAUNCH_PIPE: &str = "BUREAUCRAT_LAUNCH_PIPE";

/// Carries the heartbeat pipe fd into each worker.
pub const HEALTH_PIPE: &str = "TECTONIC_HEALTH_PIPE";

/// Overrides broker binary resolution in the supervisor.
pub const BROKER_BINARY: &str = "TECTONIC_BROKER_BINARY";

/// Log filter for the daemons' tracing subscribers.
pub const LOG_FILTER: &str = "TECTONIC_LOG";

/// The hand-off socket fd inherited from the launcher, if any.
pub fn launch_pipe_fd() -> Option<RawFd> {
    parse_fd(LAUNCH_PIPE)
}

/// The heartbeat pipe fd inherited from the supervisor, if any.
pub fn health_pipe_fd() -> Option<RawFd> {
    parse_fd(HEALTH_PIPE)
}

fn parse_fd(name: &str) -> Option<RawFd> {
    std::env::var(name).ok()?.parse().ok()
}

/// Overrides supervisor binary resolution in the launcher.
pub const SUPERVISOR_BINARY: &str = "TECTONIC_SUPERVISOR_BINARY";

/// Resolve the broker binary: explicit override, then a sibling of the
/// running executable, then PATH lookup by name.
pub fn broker_binary() -> PathBuf {
    resolve_binary(BROKER_BINARY, "bureaucrat")
}

/// Resolve the supervisor binary the same way.
pub fn supervisor_binary() -> PathBuf {
    resolve_binary(SUPERVISOR_BINARY, "proctor")
}

fn resolve_binary(override_var: &str, name: &str) -> PathBuf {
    if let Ok(explicit) = std::env::var(override_var) {
        return explicit.into();
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(name);
            if sibling.is_file() {
                return sibling;
            }
        }
    }
    PathBuf::from(name)
}
