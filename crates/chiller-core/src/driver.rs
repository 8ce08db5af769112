//! Driver layer seam.
//!
//! The driver speaks to the physical chiller. The daemon only needs two
//! things from it: run a command, and report the hardware status. Serial
//! framing lives behind this trait.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::BoxFuture;
use crate::command::ChillerCommand;
use crate::status::HardwareStatus;

/// Errors reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The chiller answered and refused the command.
    #[error("chiller rejected command: {0}")]
    Rejected(String),

    /// The chiller (or its serial link) did not answer.
    #[error("chiller communication failed: {0}")]
    Communication(String),
}

/// A backend that can operate the chiller hardware.
pub trait ChillerDriver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Execute a hardware command.
    fn execute(&self, command: ChillerCommand) -> BoxFuture<'_, Result<(), DriverError>>;

    /// Query the current hardware status.
    fn status(&self) -> BoxFuture<'_, Result<HardwareStatus, DriverError>>;
}

/// In-memory chiller used for dry runs.
///
/// Starts disabled; `enable` moves it to idle and `disable` back.
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<HardwareStatus>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HardwareStatus::Disabled),
        }
    }

    fn set(&self, status: HardwareStatus) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn get(&self) -> HardwareStatus {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChillerDriver for SimulatedDriver {
    fn name(&self) -> &str {
        "simulated"
    }

    fn execute(&self, command: ChillerCommand) -> BoxFuture<'_, Result<(), DriverError>> {
        Box::pin(async move {
            match command {
                ChillerCommand::Enable => self.set(HardwareStatus::Idle),
                ChillerCommand::Disable => self.set(HardwareStatus::Disabled),
                ChillerCommand::SetMode(_) => {
                    return Err(DriverError::Rejected(format!(
                        "{command} is not a hardware command"
                    )));
                }
            }
            debug!(%command, status = %self.get(), "Simulated chiller updated");
            Ok(())
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<HardwareStatus, DriverError>> {
        Box::pin(async move { Ok(self.get()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Mode;

    #[tokio::test]
    async fn test_simulated_enable_disable() {
        let driver = SimulatedDriver::new();
        assert_eq!(driver.status().await, Ok(HardwareStatus::Disabled));

        driver.execute(ChillerCommand::Enable).await.unwrap();
        assert_eq!(driver.status().await, Ok(HardwareStatus::Idle));

        driver.execute(ChillerCommand::Disable).await.unwrap();
        assert_eq!(driver.status().await, Ok(HardwareStatus::Disabled));
    }

    #[tokio::test]
    async fn test_simulated_rejects_mode_change() {
        let driver = SimulatedDriver::new();
        let result = driver.execute(ChillerCommand::SetMode(Mode::Automatic)).await;
        assert!(matches!(result, Err(DriverError::Rejected(_))));
    }

    #[test]
    fn test_driver_is_object_safe() {
        let driver: Box<dyn ChillerDriver> = Box::new(SimulatedDriver::default());
        assert_eq!(driver.name(), "simulated");
    }
}
