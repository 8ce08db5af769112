//! Daemon test helpers.
//!
//! [`TestDaemon`] runs a real [`Daemon`] on an ephemeral loopback port so
//! tests can drive it through [`IpcClient`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chiller_config::ChillerConfig;
use chiller_core::driver::ChillerDriver;
use chiller_core::ipc::IpcClient;
use chiller_core::{Daemon, DaemonError};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A daemon serving on `127.0.0.1:<ephemeral>` for the life of the test.
///
/// Dropping it aborts the serve task.
pub struct TestDaemon {
    pub daemon: Arc<Daemon>,
    pub addr: SocketAddr,
    handle: Option<JoinHandle<Result<(), DaemonError>>>,
}

impl TestDaemon {
    pub async fn start(config: ChillerConfig, driver: Arc<dyn ChillerDriver>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind loopback listener");
        let addr = listener.local_addr().expect("listener has no address");

        let daemon = Arc::new(Daemon::new(config, driver));
        let handle = {
            let daemon = Arc::clone(&daemon);
            tokio::spawn(async move { daemon.serve(listener).await })
        };

        Self {
            daemon,
            addr,
            handle: Some(handle),
        }
    }

    /// A client pointed at this daemon.
    pub fn client(&self) -> IpcClient {
        IpcClient::new(self.addr.to_string())
    }

    /// Signal shutdown and wait for the serve task to finish.
    pub async fn stop(mut self) -> Result<(), DaemonError> {
        self.daemon.shutdown();
        self.join().await
    }

    /// Wait for the serve task to finish on its own (e.g. after `/stop`).
    pub async fn join(&mut self) -> Result<(), DaemonError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon did not stop within 5s")
            .expect("daemon task panicked")
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
