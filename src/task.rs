//! Eagerly-evaluated units of work with panic capture.
//!
//! A [`Task`] runs a closure immediately on construction and stores either
//! its result or the payload of a panic that escaped it. This turns a
//! panicking model component into an inspectable outcome instead of tearing
//! down the whole simulation: the driver decides whether to report, retry
//! or abort.
//!
//! Tasks are synchronous and complete before [`Task::run`] returns; they do
//! not interact with the scheduler. For time-consuming concurrent work use
//! processes ([`Scheduler::spawn`](crate::Scheduler::spawn)) instead.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// The outcome of running a closure to completion, panics included.
pub struct Task<T> {
    outcome: Result<T, Box<dyn Any + Send>>,
}

impl<T> Task<T> {
    /// Runs `work` immediately and captures its result or panic payload.
    pub fn run(work: impl FnOnce() -> T) -> Self {
        Task {
            outcome: panic::catch_unwind(AssertUnwindSafe(work)),
        }
    }

    /// Returns `true` if the closure panicked.
    pub fn is_panicked(&self) -> bool {
        self.outcome.is_err()
    }

    /// The produced value, or `None` if the closure panicked.
    pub fn result(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The panic payload, or `None` if the closure completed.
    pub fn panic_payload(&self) -> Option<&(dyn Any + Send)> {
        self.outcome.as_ref().err().map(|p| p.as_ref())
    }

    /// Consumes the task, yielding the value or the panic payload.
    pub fn into_result(self) -> Result<T, Box<dyn Any + Send>> {
        self.outcome
    }

    /// Consumes the task, returning the value or resuming the captured
    /// panic on the current thread.
    pub fn unwrap(self) -> T {
        match self.outcome {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
