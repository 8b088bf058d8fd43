//! Workspace-level specs: the broker running in-process, exercised through
//! the client crate exactly the way workers use it.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/broker.rs"]
mod broker;

#[path = "specs/rotation.rs"]
mod rotation;
