// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared plumbing for the tectonic process tree: the log directory layout,
//! in-place log rotation, the session-group file, and the environment
//! variable contract between launcher, supervisor, broker, and workers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod paths;
pub mod pgroup;
pub mod rotate;

pub use paths::{LogTree, CONTROL_SOCKET_PATH, PGROUP_PATH};
pub use pgroup::PgroupError;
pub use rotate::{
    open_log_fd, rotate_path, start_rotation_thread, LogRotation, DEFAULT_ITERATIONS,
    DEFAULT_MAX_SIZE,
};
