// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: starts the broker, keeps a fleet of identical workers
//! alive, and tears the tree down when told to — or when the broker dies.
//!
//! Signal delivery is observed as ordinary readiness in the main loop
//! (tokio's signal streams serialize it), so reaping never races request
//! handling. Worker liveness is tracked through per-worker heartbeat pipes:
//! a worker that has announced itself and then goes silent past the murder
//! wait is killed and respawned.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod handoff;
mod run;
mod spawn;
pub mod table;

pub use handoff::LaunchPipe;
pub use run::{Supervisor, SupervisorConfig, SupervisorError};
