// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervision loop: reap, respawn, murder, shut down.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use tectonic_client::{self as client, ClientError, StandardPair};
use tectonic_core::LogTree;

use crate::spawn;
use crate::table::{ChildRecord, Heartbeat, ProcessTable, Role};

/// Pause between startup attempts to reach the broker.
const READY_RETRY: Duration = Duration::from_millis(100);

/// Supervisor configuration, threaded explicitly through construction.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// The worker command and its arguments.
    pub worker_invocation: Vec<String>,
    /// How many workers to keep alive.
    pub workers: usize,
    /// Root of the log tree.
    pub log_tree: LogTree,
    /// The broker's control socket path.
    pub socket_path: PathBuf,
    /// How long to wait for the broker to come up.
    pub ready_timeout: Duration,
    /// Kill a worker after this much heartbeat silence.
    pub murder_wait: Duration,
}

impl SupervisorConfig {
    pub fn new(worker_invocation: Vec<String>, workers: usize, log_tree: LogTree) -> Self {
        Self {
            worker_invocation,
            workers,
            log_tree,
            socket_path: PathBuf::from(tectonic_core::CONTROL_SOCKET_PATH),
            ready_timeout: Duration::from_secs(5),
            murder_wait: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("broker did not come up: {0}")]
    BrokerUnavailable(#[source] ClientError),

    #[error("broker exited during startup")]
    BrokerExited,

    #[error("could not obtain worker stdio from the broker: {0}")]
    StdPair(#[source] ClientError),

    #[error("could not spawn child: {0}")]
    Spawn(#[source] io::Error),

    #[error("background request failed to complete")]
    RequestAborted,

    #[error("wait failed: {0}")]
    Wait(#[source] Errno),

    #[error(transparent)]
    Io(#[from] io::Error),
}

enum Outcome {
    Continue,
    BrokerDied,
}

/// The supervisor process state.
pub struct Supervisor {
    config: SupervisorConfig,
    table: ProcessTable,
    running: bool,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config, table: ProcessTable::new(), running: true }
    }

    /// Start the broker and confirm it reachable.
    ///
    /// Reachability is proven the way every worker will use it: by
    /// obtaining the worker std pair over the control socket.
    pub async fn start(&mut self) -> Result<(), SupervisorError> {
        let broker_pid = spawn::spawn_broker(&self.config.log_tree).map_err(SupervisorError::Spawn)?;
        self.table
            .insert(broker_pid, ChildRecord { role: Role::Broker, command: Vec::new(), heartbeat: None });

        let socket_path = self.config.socket_path.clone();
        let ready_timeout = self.config.ready_timeout;
        tokio::task::spawn_blocking(move || client::await_ready(&socket_path, ready_timeout))
            .await
            .map_err(|_| SupervisorError::RequestAborted)?
            .map_err(SupervisorError::BrokerUnavailable)?;

        // First real exchange doubles as the readiness proof. The socket
        // file can appear a beat before the accept loop runs, so retry
        // transient failures while the broker child is still alive.
        let deadline = Instant::now() + self.config.ready_timeout;
        loop {
            if self.broker_exited(broker_pid)? {
                return Err(SupervisorError::BrokerExited);
            }
            match self.fresh_std_pair().await {
                Ok(pair) => {
                    drop(pair);
                    break;
                }
                Err(e) if Instant::now() < deadline => {
                    debug!(error = %e, "broker not answering yet, retrying");
                    tokio::time::sleep(READY_RETRY).await;
                }
                Err(e) => return Err(e),
            }
        }
        info!(broker_pid, "broker confirmed reachable");
        Ok(())
    }

    /// Nonblocking check whether the broker child has already exited. A
    /// positive answer also reaps it and drops its table record.
    fn broker_exited(&mut self, broker_pid: i32) -> Result<bool, SupervisorError> {
        loop {
            match waitpid(Pid::from_raw(broker_pid), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return Ok(false),
                Ok(_) | Err(Errno::ECHILD) => {
                    self.table.remove(broker_pid);
                    return Ok(true);
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(SupervisorError::Wait(e)),
            }
        }
    }

    /// Fork the initial worker fleet.
    pub async fn spawn_workers(&mut self) -> Result<(), SupervisorError> {
        for _ in 0..self.config.workers {
            self.respawn_worker(self.config.worker_invocation.clone()).await?;
        }
        info!(workers = self.config.workers, "worker fleet running");
        Ok(())
    }

    /// Supervise until a terminal signal clears the running flag or the
    /// broker dies. Returns the exit code for the process.
    pub async fn run(&mut self) -> Result<i32, SupervisorError> {
        let mut sigchld = signal(SignalKind::child())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut code = 0;
        while self.running {
            tokio::select! {
                _ = sigchld.recv() => {
                    if matches!(self.reap_and_respawn().await?, Outcome::BrokerDied) {
                        error!("broker died; shutting the tree down");
                        self.running = false;
                        code = 1;
                    }
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    self.running = false;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received");
                    self.running = false;
                }
                _ = tick.tick() => self.murder_stale(),
            }
        }
        self.shutdown(code).await
    }

    /// Reap every exited child and respawn the dead workers in the same
    /// pass, so a burst of k exits yields exactly k respawns.
    async fn reap_and_respawn(&mut self) -> Result<Outcome, SupervisorError> {
        let (reaped, broker_died) = self.reap_exited()?;
        if broker_died {
            return Ok(Outcome::BrokerDied);
        }
        for record in reaped {
            self.respawn_worker(record.command).await?;
        }
        Ok(Outcome::Continue)
    }

    /// Nonblocking `waitpid` sweep. Returns the reaped worker records and
    /// whether the broker was among the dead.
    fn reap_exited(&mut self) -> Result<(Vec<ChildRecord>, bool), SupervisorError> {
        let mut reaped = Vec::new();
        let mut broker_died = false;
        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => {
                    let Some(pid) = status.pid() else { break };
                    match self.table.remove(pid.as_raw()) {
                        Some(record) => {
                            info!(pid = pid.as_raw(), role = ?record.role, status = ?status, "child exited");
                            match record.role {
                                Role::Broker => broker_died = true,
                                Role::Worker => reaped.push(record),
                            }
                        }
                        None => warn!(pid = pid.as_raw(), "reaped a child not in the table"),
                    }
                }
                Err(Errno::ECHILD) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(SupervisorError::Wait(e)),
            }
        }
        Ok((reaped, broker_died))
    }

    /// Spawn one worker with freshly requested stdio descriptors, so
    /// post-rotation writes land in the current files.
    async fn respawn_worker(&mut self, command: Vec<String>) -> Result<(), SupervisorError> {
        let pair = self.fresh_std_pair().await?;
        let spawned = spawn::spawn_worker(&command, pair).map_err(SupervisorError::Spawn)?;
        self.table.insert(
            spawned.pid,
            ChildRecord {
                role: Role::Worker,
                command,
                heartbeat: Some(Heartbeat::new(spawned.heartbeat)),
            },
        );
        Ok(())
    }

    /// Request the current worker std pair from the broker.
    async fn fresh_std_pair(&self) -> Result<StandardPair, SupervisorError> {
        let socket_path = self.config.socket_path.clone();
        tokio::task::spawn_blocking(move || client::request_worker_std_pair(&socket_path))
            .await
            .map_err(|_| SupervisorError::RequestAborted)?
            .map_err(SupervisorError::StdPair)
    }

    /// Kill workers whose heartbeats went silent past the murder wait;
    /// the resulting SIGCHLD respawns them.
    fn murder_stale(&mut self) {
        let now = Instant::now();
        for pid in self.table.stale_workers(now, self.config.murder_wait) {
            warn!(pid, "worker heartbeat silent too long, killing");
            if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGKILL) {
                warn!(pid, error = %e, "could not kill stale worker");
            }
        }
    }

    /// Terminate every living child, escalate to SIGKILL after the grace
    /// period, and unlink the control socket path.
    pub async fn shutdown(&mut self, code: i32) -> Result<i32, SupervisorError> {
        self.running = false;
        info!(children = self.table.len(), "shutting down");

        for pid in self.table.pids() {
            let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.table.is_empty() && Instant::now() < deadline {
            let _ = self.reap_exited()?;
            if !self.table.is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }

        for pid in self.table.pids() {
            warn!(pid, "straggler gets SIGKILL");
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
        while !self.table.is_empty() {
            let _ = self.reap_exited()?;
            if !self.table.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        info!(code, "tree is down");
        Ok(code)
    }
}
