// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control socket server: accept, dispatch, transfer.

use std::io;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tectonic_core::LogTree;
use tectonic_passage as passage;
use tectonic_passage::PassageError;
use tectonic_wire::{read_message, send_message, Message, ProtocolError};

use crate::registry::{ListenerKey, Registry};
use crate::rotation::{open_worker_pair, SharedStdPair, WorkerPairRotation};

/// Broker configuration, threaded explicitly through construction.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Path of the Unix-domain control socket.
    pub socket_path: PathBuf,
    /// Root of the log tree.
    pub log_tree: LogTree,
    /// Worker-log rotation check interval.
    pub rotate_interval: Duration,
    /// Worker-log rotation threshold in bytes.
    pub max_size: u64,
    /// Worker-log archive depth.
    pub iterations: u32,
}

impl BrokerConfig {
    pub fn new(log_tree: LogTree, rotate_interval: Duration) -> Self {
        Self {
            socket_path: PathBuf::from(tectonic_core::CONTROL_SOCKET_PATH),
            log_tree,
            rotate_interval,
            max_size: tectonic_core::DEFAULT_MAX_SIZE,
            iterations: tectonic_core::DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Passage(#[from] PassageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The broker process state.
pub struct Broker {
    config: BrokerConfig,
    registry: Arc<Mutex<Registry>>,
    worker_pair: Arc<Mutex<SharedStdPair>>,
}

impl Broker {
    /// Open the worker log pair and bind the control socket.
    ///
    /// Binding happens last so a failed startup never leaves a live socket
    /// file behind.
    pub fn bind(config: BrokerConfig) -> Result<(Self, UnixListener), BrokerError> {
        config.log_tree.ensure()?;
        let worker_pair = Arc::new(Mutex::new(open_worker_pair(&config.log_tree)?));

        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }
        let listener = UnixListener::bind(&config.socket_path)?;
        info!(path = %config.socket_path.display(), "control socket bound");

        let broker =
            Self { config, registry: Arc::new(Mutex::new(Registry::new())), worker_pair };
        Ok((broker, listener))
    }

    /// Serve until `shutdown` fires.
    ///
    /// Connections are handled one at a time, to completion, in arrival
    /// order; the protocol offers no cross-connection ordering beyond that.
    pub async fn run(self, listener: UnixListener, shutdown: CancellationToken) {
        let rotation = match WorkerPairRotation::new(
            &self.config.log_tree,
            self.config.max_size,
            self.config.iterations,
            Arc::clone(&self.worker_pair),
        ) {
            Ok(rotation) => rotation,
            Err(e) => {
                error!(error = %e, "could not start worker log rotation");
                return;
            }
        };
        let interval = jittered(self.config.rotate_interval);
        let rotation_task =
            tokio::spawn(rotation.run(interval, shutdown.child_token()));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => self.handle(stream).await,
                    Err(e) => error!(error = %e, "accept error"),
                }
            }
        }

        if let Err(e) = rotation_task.await {
            error!(error = %e, "rotation task failed");
        }
        info!("broker stopped");
    }

    /// Handle one control connection start to finish.
    ///
    /// The exchange runs blocking (descriptor transfer needs the raw
    /// socket) on the blocking pool, awaited inline to keep handling
    /// serialized. A failure drops this client and nothing else.
    async fn handle(&self, stream: tokio::net::UnixStream) {
        let stream = match stream.into_std().and_then(|s| {
            s.set_nonblocking(false)?;
            Ok(s)
        }) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "could not prepare client stream");
                return;
            }
        };

        let registry = Arc::clone(&self.registry);
        let worker_pair = Arc::clone(&self.worker_pair);
        let outcome = tokio::task::spawn_blocking(move || {
            handle_connection(stream, &registry, &worker_pair)
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "dropping client connection"),
            Err(e) => error!(error = %e, "connection handler panicked"),
        }
    }
}

/// Read one request, dispatch, respond, transfer. Any error here abandons
/// only this client.
fn handle_connection(
    mut stream: std::os::unix::net::UnixStream,
    registry: &Mutex<Registry>,
    worker_pair: &Mutex<SharedStdPair>,
) -> Result<(), BrokerError> {
    let (request, pid) = read_message(&mut stream)?;
    info!(pid, request = ?request, "request");

    match request {
        Message::WantTCPListener { ref host, port, listen } => {
            let key = ListenerKey { host: host.clone(), port, listen };
            let fd = {
                let mut registry = registry.lock();
                match registry.tcp_listener(key) {
                    Ok(listener) => listener.as_raw_fd(),
                    Err(e) => return refuse(&mut stream, &request, pid, &e),
                }
            };
            let response = Message::HaveTCPListener { host: host.clone(), port };
            send_message(&mut stream, &response)?;
            passage::transfer(&stream, &[passage::SOCKET_FIELD], &[fd])?;
        }

        Message::WantChannel { ref identity, ref partner } => {
            if identity == partner {
                let e = io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "a channel needs two distinct peers",
                );
                return refuse(&mut stream, &request, pid, &e);
            }
            let fd = {
                let mut registry = registry.lock();
                match registry.channel_end(identity, partner) {
                    Ok(end) => end.as_raw_fd(),
                    Err(e) => return refuse(&mut stream, &request, pid, &e),
                }
            };
            let response =
                Message::HaveChannel { identity: identity.clone(), partner: partner.clone() };
            send_message(&mut stream, &response)?;
            passage::transfer(&stream, &[passage::SOCKET_FIELD], &[fd])?;
        }

        Message::WantWorkerStandardPair { .. } => {
            // Hold the lock across the transfer so rotation can't republish
            // between reading the pair and sending it.
            let pair = worker_pair.lock();
            send_message(&mut stream, &Message::HaveWorkerStandardPair { ignored: true })?;
            passage::transfer(&stream, &["stdout", "stderr"], &pair.raw_fds())?;
        }

        // Only Want… requests arrive from well-behaved clients.
        other => {
            warn!(pid, request = ?other, "unexpected message on control socket");
        }
    }
    Ok(())
}

/// Tell the client why before hanging up: `Failure` echoing its request.
fn refuse(
    stream: &mut std::os::unix::net::UnixStream,
    request: &Message,
    pid: u32,
    error: &dyn std::fmt::Display,
) -> Result<(), BrokerError> {
    warn!(pid, request = ?request, error = %error, "refusing request");
    let mut request_message = serde_json::to_value(request)?;
    request_message["__pid__"] = pid.into();
    send_message(stream, &Message::Failure { request_message })?;
    Ok(())
}

/// Sub-second jitter so a fleet of brokers doesn't tick in lockstep.
fn jittered(interval: Duration) -> Duration {
    use rand::Rng;
    interval + Duration::from_millis(rand::rng().random_range(0..250))
}
