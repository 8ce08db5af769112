//! Core daemon process — startup, status polling, and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use chiller_config::ChillerConfig;

use crate::authorizer::CommandGate;
use crate::driver::ChillerDriver;
use crate::ipc::IpcState;
use crate::status::HardwareStatus;

/// Lower bound on the status poll period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// One chiller daemon instance.
pub struct Daemon {
    config: Arc<ChillerConfig>,
    gate: Arc<CommandGate>,
    driver: Arc<dyn ChillerDriver>,
    status_tx: watch::Sender<HardwareStatus>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    _shutdown_rx: broadcast::Receiver<ShutdownSignal>,
    stopping: AtomicBool,
    started_at: Instant,
}

impl Daemon {
    /// Create a daemon in manual mode. The hardware status reads as
    /// disabled until the first poll.
    pub fn new(config: ChillerConfig, driver: Arc<dyn ChillerDriver>) -> Self {
        let config = Arc::new(config);
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        let (status_tx, _) = watch::channel(HardwareStatus::Disabled);

        Self {
            gate: Arc::new(CommandGate::new(Arc::clone(&config))),
            config,
            driver,
            status_tx,
            shutdown_tx,
            _shutdown_rx,
            stopping: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    /// Bind the configured endpoint and run until shutdown.
    pub async fn run(&self) -> Result<(), DaemonError> {
        let addr = self.config.daemon.address();
        info!(daemon = %self.config.daemon.name, %addr, driver = self.driver.name(), "chillerd starting");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| DaemonError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve IPC on `listener` and poll the driver until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), DaemonError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.stopping.load(Ordering::SeqCst) {
            info!("Shutdown requested before start");
            return Ok(());
        }
        let server = tokio::spawn(crate::ipc::server::serve(
            listener,
            self.ipc_state(),
            self.shutdown_tx.subscribe(),
        ));

        let mut ticker = tokio::time::interval(self.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping daemon");
                    break;
                }
                _ = &mut ctrl_c => {
                    warn!("Ctrl-C received, initiating graceful shutdown");
                    self.shutdown();
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        server.await.map_err(std::io::Error::other)??;
        info!("Daemon stopped");
        Ok(())
    }

    /// Query the driver once and publish the result.
    ///
    /// A driver that cannot be reached is reported as disabled.
    pub async fn poll_once(&self) -> HardwareStatus {
        let status = match self.driver.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Status query failed");
                HardwareStatus::Disabled
            }
        };

        let previous = self.status_tx.send_replace(status);
        if previous != status {
            info!(from = %previous, to = %status, "Chiller status changed");
        } else {
            debug!(%status, "Chiller status unchanged");
        }
        status
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// Last published hardware status.
    pub fn status(&self) -> HardwareStatus {
        *self.status_tx.borrow()
    }

    /// Shared state for the IPC route handlers.
    pub fn ipc_state(&self) -> Arc<IpcState> {
        Arc::new(IpcState {
            gate: Arc::clone(&self.gate),
            driver: Arc::clone(&self.driver),
            status: self.status_tx.subscribe(),
            shutdown_tx: self.shutdown_tx.clone(),
            started_at: self.started_at,
        })
    }

    pub fn gate(&self) -> &CommandGate {
        &self.gate
    }

    /// Get a reference to the daemon's configuration.
    pub fn config(&self) -> &ChillerConfig {
        &self.config
    }

    fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.config.query_delay)
            .unwrap_or(MIN_POLL_INTERVAL)
            .max(MIN_POLL_INTERVAL)
    }
}

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
