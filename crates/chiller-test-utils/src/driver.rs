//! Scripted driver for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chiller_core::BoxFuture;
use chiller_core::command::ChillerCommand;
use chiller_core::driver::{ChillerDriver, DriverError};
use chiller_core::status::HardwareStatus;

/// Driver whose answers are set by the test.
///
/// `execute` pops queued outcomes and succeeds once the queue is empty.
/// Every command it receives is recorded; [`completed`](Self::completed)
/// counts the ones whose hardware exchange ran to the end.
#[derive(Debug)]
pub struct ScriptedDriver {
    status: Mutex<Result<HardwareStatus, DriverError>>,
    outcomes: Mutex<VecDeque<Result<(), DriverError>>>,
    received: Mutex<Vec<ChillerCommand>>,
    completed: AtomicUsize,
    delay: Duration,
}

impl ScriptedDriver {
    pub fn new(status: HardwareStatus) -> Self {
        Self {
            status: Mutex::new(Ok(status)),
            outcomes: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Make every `execute` take `delay`, like a slow serial exchange.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `execute` calls that finished.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Answer status queries with `status` from now on.
    pub fn set_status(&self, status: Result<HardwareStatus, DriverError>) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Queue the outcome of the next `execute`.
    pub fn push_outcome(&self, outcome: Result<(), DriverError>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Commands received so far, in order.
    pub fn received(&self) -> Vec<ChillerCommand> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChillerDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn execute(&self, command: ChillerCommand) -> BoxFuture<'_, Result<(), DriverError>> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(()));
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            outcome
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<HardwareStatus, DriverError>> {
        let status = self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Box::pin(async move { status })
    }
}
