#![deny(unsafe_code)]

//! chillerd core daemon runtime.
//!
//! Owns the control state of one chiller: the operating mode, the
//! single-command gate, the last polled hardware status, and the IPC server
//! that control machines talk to. Hardware access goes through the
//! [`ChillerDriver`] trait.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, used as the return type of
/// trait methods that must stay object-safe (`dyn ChillerDriver`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Caller authorization and the single-command gate.
pub mod authorizer;
/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Commands a control machine can issue.
pub mod command;
/// Daemon runtime: status polling, IPC serving, shutdown.
pub mod daemon;
/// Hardware driver trait and the simulated backend.
pub mod driver;
/// HTTP-over-TCP control interface.
pub mod ipc;
/// Tracing subscriber setup (journald or stdout).
pub mod logging;
/// Mode, hardware status, and command result codes with their labels.
pub mod status;

pub use authorizer::CommandGate;
pub use command::ChillerCommand;
pub use daemon::{Daemon, DaemonError, ShutdownSignal};
pub use driver::{ChillerDriver, DriverError, SimulatedDriver};
pub use status::{CommandResult, HardwareStatus, Mode};
