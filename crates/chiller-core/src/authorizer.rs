//! Command authorization and the single-command gate.
//!
//! Every command passes the same checks, in this order:
//!
//! 1. caller address must be an authorized control machine (`InvalidControlIp`)
//! 2. no other command may be executing (`Blocked`)
//! 3. hardware commands need manual mode (`ModeIsAutomatic`)
//!
//! Address checks come first so an unauthorized caller learns nothing about
//! the busy flag or the mode.
//!
//! [`CommandGate`] holds the mode and the in-flight flag behind one mutex.
//! The decision, the mode change, and setting the in-flight flag all happen
//! inside that critical section; the driver call happens outside it, with an
//! [`InFlightGuard`] clearing the flag on every exit path.

use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chiller_config::ChillerConfig;
use tracing::{info, warn};

use crate::command::ChillerCommand;
use crate::driver::{ChillerDriver, DriverError};
use crate::status::{CommandResult, Mode};

/// Decide whether a command may be dispatched.
///
/// `Ok(())` means dispatch; `Err` carries the rejection code.
pub fn authorize(
    command: ChillerCommand,
    caller: IpAddr,
    config: &ChillerConfig,
    mode: Mode,
    in_flight: bool,
) -> Result<(), CommandResult> {
    if !config.is_control_ip(caller) {
        return Err(CommandResult::InvalidControlIp);
    }
    if in_flight {
        return Err(CommandResult::Blocked);
    }
    if command.requires_manual() && mode == Mode::Automatic {
        return Err(CommandResult::ModeIsAutomatic);
    }
    Ok(())
}

/// Map a driver outcome onto a result code.
pub fn driver_result(outcome: &Result<(), DriverError>) -> CommandResult {
    match outcome {
        Ok(()) => CommandResult::Succeeded,
        Err(DriverError::Rejected(_)) => CommandResult::Failed,
        Err(DriverError::Communication(_)) => CommandResult::DriverUnreachable,
    }
}

/// Mutable control state shared by all command handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub mode: Mode,
    pub in_flight: bool,
}

/// Serializes command execution for one daemon instance.
#[derive(Debug)]
pub struct CommandGate {
    config: Arc<ChillerConfig>,
    state: Mutex<ControlState>,
}

impl CommandGate {
    /// Create a gate in manual mode with nothing in flight.
    pub fn new(config: Arc<ChillerConfig>) -> Self {
        Self {
            config,
            state: Mutex::new(ControlState {
                mode: Mode::Manual,
                in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current mode and in-flight flag.
    pub fn snapshot(&self) -> ControlState {
        *self.lock()
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Address-only check, for requests that are not chiller commands.
    pub fn check_caller(&self, caller: IpAddr) -> Result<(), CommandResult> {
        if self.config.is_control_ip(caller) {
            Ok(())
        } else {
            warn!(%caller, "Rejected request from unauthorized address");
            Err(CommandResult::InvalidControlIp)
        }
    }

    /// Authorize `command` and, if accepted, run it to completion.
    pub async fn execute(
        &self,
        command: ChillerCommand,
        caller: IpAddr,
        driver: &dyn ChillerDriver,
    ) -> CommandResult {
        let _guard = match self.begin(command, caller) {
            Ok(Some(guard)) => guard,
            Ok(None) => return CommandResult::Succeeded,
            Err(result) => return result,
        };

        let outcome = driver.execute(command).await;
        let result = driver_result(&outcome);
        match &outcome {
            Ok(()) => info!(%command, %caller, "Command completed"),
            Err(e) => warn!(%command, %caller, error = %e, code = result.code(), "Command failed"),
        }
        result
    }

    /// The critical section: decide, then either apply a mode change or
    /// mark a command in flight.
    fn begin(
        &self,
        command: ChillerCommand,
        caller: IpAddr,
    ) -> Result<Option<InFlightGuard<'_>>, CommandResult> {
        let mut state = self.lock();
        if let Err(result) = authorize(command, caller, &self.config, state.mode, state.in_flight) {
            warn!(%command, %caller, code = result.code(), "Command rejected: {result}");
            return Err(result);
        }

        if let ChillerCommand::SetMode(mode) = command {
            if state.mode != mode {
                info!(%caller, from = %state.mode, to = %mode, "Mode changed");
            }
            state.mode = mode;
            return Ok(None);
        }

        state.in_flight = true;
        Ok(Some(InFlightGuard { gate: self }))
    }
}

/// Clears the in-flight flag when dropped.
#[must_use]
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    gate: &'a CommandGate,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gate.lock().in_flight = false;
    }
}
