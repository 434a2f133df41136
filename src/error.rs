//! Error types used by the fanring scheduler.
//!
//! This module defines [`SchedulerError`], the synchronous-contract errors
//! returned to callers that misuse the scheduler API.
//!
//! Two other failure classes deliberately do **not** appear here:
//!
//! - Scheduler invariant violations (a pass started while the previous
//!   traversal is unfinished) are programming errors and panic immediately.
//! - Subscriber callback failures are isolated per node and surfaced
//!   asynchronously through the [`FaultSink`](crate::FaultSink); they never
//!   propagate synchronously to the caller that triggered the update.

use thiserror::Error;

/// # Errors returned by scheduler entry points.
///
/// These represent caller-side contract violations, thrown synchronously.
/// They are never produced by subscriber code running inside a pass.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `dispatch` was called before a state container was attached.
    #[error("no store attached; call attach_store() before dispatch()")]
    NoStore,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanring::SchedulerError;
    ///
    /// assert_eq!(SchedulerError::NoStore.as_label(), "scheduler_no_store");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::NoStore => "scheduler_no_store",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::NoStore => "dispatch requires an attached store".to_string(),
        }
    }
}
