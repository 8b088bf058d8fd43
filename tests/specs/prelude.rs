//! Shared helpers for specs.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tectonic_broker::{Broker, BrokerConfig};
use tectonic_core::LogTree;

/// One broker running on its own runtime in a temp directory.
pub struct BrokerHarness {
    pub socket_path: PathBuf,
    dir: tempfile::TempDir,
    shutdown: CancellationToken,
    runtime: Option<tokio::runtime::Runtime>,
}

impl BrokerHarness {
    pub fn start() -> Self {
        Self::start_with(|_| {})
    }

    pub fn start_with(adjust: impl FnOnce(&mut BrokerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("bureaucrat.sock");

        let mut config =
            BrokerConfig::new(LogTree::new(dir.path().join("logs")), Duration::from_millis(100));
        config.socket_path = socket_path.clone();
        adjust(&mut config);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let shutdown = CancellationToken::new();

        let (broker, listener) = {
            let _guard = runtime.enter();
            Broker::bind(config).unwrap()
        };
        runtime.spawn(broker.run(listener, shutdown.clone()));
        tectonic_client::await_ready(&socket_path, Duration::from_secs(5)).unwrap();

        Self { socket_path, dir, shutdown, runtime: Some(runtime) }
    }

    pub fn workers_log(&self, name: &str) -> PathBuf {
        self.dir.path().join("logs").join("workers").join(name)
    }
}

impl Drop for BrokerHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(2));
        }
    }
}

/// Poll `condition` until it holds or `timeout` expires.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
