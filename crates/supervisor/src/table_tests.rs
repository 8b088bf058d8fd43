// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process table and heartbeat staleness tests.

use std::time::{Duration, Instant};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd::pipe;
use std::os::fd::{AsRawFd, OwnedFd};

use super::*;

const MURDER_WAIT: Duration = Duration::from_secs(30);

fn nonblocking_pipe() -> (OwnedFd, OwnedFd) {
    let (read_end, write_end) = pipe().unwrap();
    fcntl(read_end.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();
    (read_end, write_end)
}

fn worker(heartbeat: Heartbeat) -> ChildRecord {
    ChildRecord {
        role: Role::Worker,
        command: vec!["worker".to_string()],
        heartbeat: Some(heartbeat),
    }
}

#[test]
fn broker_pid_is_found_among_workers() {
    let mut table = ProcessTable::new();
    let (read_end, _write_end) = nonblocking_pipe();
    table.insert(7, worker(Heartbeat::new(read_end)));
    table.insert(3, ChildRecord { role: Role::Broker, command: vec![], heartbeat: None });

    assert_eq!(table.broker_pid(), Some(3));
    assert_eq!(table.len(), 2);
}

#[test]
fn unarmed_heartbeat_is_never_stale() {
    let (read_end, _write_end) = nonblocking_pipe();
    let mut heartbeat = Heartbeat::new(read_end);
    heartbeat.backdate(MURDER_WAIT * 10);

    assert!(!heartbeat.stale(Instant::now(), MURDER_WAIT));
}

#[test]
fn heartbeat_arms_on_first_byte_and_goes_stale_after_silence() {
    let (read_end, write_end) = nonblocking_pipe();
    let mut heartbeat = Heartbeat::new(read_end);

    nix::unistd::write(&write_end, &[0u8]).unwrap();
    let now = Instant::now();
    heartbeat.drain(now);
    assert!(!heartbeat.stale(now, MURDER_WAIT));

    heartbeat.backdate(MURDER_WAIT * 2);
    assert!(heartbeat.stale(Instant::now(), MURDER_WAIT));
}

#[test]
fn fresh_bytes_reset_staleness() {
    let (read_end, write_end) = nonblocking_pipe();
    let mut heartbeat = Heartbeat::new(read_end);

    nix::unistd::write(&write_end, &[0u8]).unwrap();
    heartbeat.drain(Instant::now());
    heartbeat.backdate(MURDER_WAIT * 2);

    nix::unistd::write(&write_end, &[0u8]).unwrap();
    let now = Instant::now();
    heartbeat.drain(now);
    assert!(!heartbeat.stale(now, MURDER_WAIT));
}

#[test]
fn stale_workers_reports_only_silent_armed_workers() {
    let mut table = ProcessTable::new();

    // Armed then silent: stale.
    let (read_one, write_one) = nonblocking_pipe();
    let mut silent = Heartbeat::new(read_one);
    nix::unistd::write(&write_one, &[0u8]).unwrap();
    silent.drain(Instant::now());
    silent.backdate(MURDER_WAIT * 2);
    table.insert(11, worker(silent));

    // Never armed: left alone.
    let (read_two, _write_two) = nonblocking_pipe();
    table.insert(12, worker(Heartbeat::new(read_two)));

    // Broker has no heartbeat at all.
    table.insert(1, ChildRecord { role: Role::Broker, command: vec![], heartbeat: None });

    let stale = table.stale_workers(Instant::now(), MURDER_WAIT);
    assert_eq!(stale, vec![11]);
}

#[test]
fn drain_consumes_a_burst_of_heartbeats() {
    let (read_end, write_end) = nonblocking_pipe();
    let mut heartbeat = Heartbeat::new(read_end);

    for _ in 0..100 {
        nix::unistd::write(&write_end, &[0u8]).unwrap();
    }
    heartbeat.drain(Instant::now());

    // Pipe fully drained: a second drain finds nothing but stays armed.
    let now = Instant::now();
    heartbeat.drain(now);
    assert!(!heartbeat.stale(now, MURDER_WAIT));
}
