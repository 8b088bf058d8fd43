// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kill mode: signal the recorded process group and verify it is gone.

use std::path::Path;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

use tectonic_core::pgroup;

/// How long to wait for the group to disappear after SIGTERM.
const TERM_GRACE_POLLS: u32 = 5;

/// Terminate the tree recorded in `pgroup_file`. Returns the exit code;
/// residual processes are reported and count as failure.
pub fn kill_tree(pgroup_file: &Path) -> i32 {
    let pgrp = match pgroup::read(pgroup_file) {
        Ok(pgrp) => Pid::from_raw(pgrp),
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    // Probe before signaling, so a stale file gets a clear message.
    match killpg(pgrp, None) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            eprintln!("Process group {pgrp} no longer running");
            return 1;
        }
        Err(e) => {
            eprintln!("Could not probe process group {pgrp}: {e}");
            return 1;
        }
    }

    match killpg(pgrp, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            eprintln!("Process group {pgrp} appeared to terminate abnormally");
            return 1;
        }
        Err(e) => {
            eprintln!("Could not terminate process group {pgrp}: {e}");
            return 1;
        }
    }

    for _ in 0..TERM_GRACE_POLLS {
        if matches!(killpg(pgrp, None), Err(Errno::ESRCH)) {
            return 0;
        }
        std::thread::sleep(Duration::from_secs(1));
    }

    if matches!(killpg(pgrp, Signal::SIGKILL), Err(Errno::ESRCH)) {
        return 0;
    }
    if matches!(killpg(pgrp, None), Err(Errno::ESRCH)) {
        return 0;
    }

    eprintln!("At least one process in process group {pgrp} sleeping uninterruptibly");
    1
}

#[cfg(test)]
#[path = "kill_tests.rs"]
mod tests;
