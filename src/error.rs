//! Error types used by the tickvisor host and driver.
//!
//! This module defines two main error enums:
//!
//! - [`HostError`]: precondition violations reported synchronously by the
//!   scheduler, the container tree, [`JoinAll`](crate::JoinAll) and
//!   [`TrackedTask`](crate::TrackedTask).
//! - [`RuntimeError`]: failures of the [`Driver`](crate::Driver) frame loop.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.
//!
//! A task that never completes is not an error: the host has no way to tell a
//! slow routine from a stuck one. Callers that need a deadline set
//! [`Config::max_frames`](crate::Config::max_frames) on the driver.

use thiserror::Error;

use crate::core::ContainerId;

/// # Precondition violations raised by the host.
///
/// None of these are retryable: they describe a call that was invalid at the
/// moment it was made (a destroyed container, an empty name, ...).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A container name was empty.
    #[error("container name must not be empty")]
    EmptyName,

    /// The container was destroyed (or never existed).
    #[error("container {container} is gone")]
    ContainerGone {
        /// The container that was addressed.
        container: ContainerId,
    },

    /// The container already hosts a tracked task.
    #[error("container {container} already hosts a tracked task")]
    ContainerOccupied {
        /// The container that was addressed.
        container: ContainerId,
    },

    /// The root container cannot be destroyed.
    #[error("the root container cannot be destroyed")]
    RootContainer,

    /// The scheduler referenced by a combinator or tracked task was dropped.
    #[error("scheduler has been dropped")]
    SchedulerGone,

    /// `tick` was called from inside a routine step.
    #[error("tick called while a frame is already being advanced")]
    ReentrantTick,
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tickvisor::HostError;
    ///
    /// assert_eq!(HostError::EmptyName.as_label(), "host_empty_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::EmptyName => "host_empty_name",
            HostError::ContainerGone { .. } => "host_container_gone",
            HostError::ContainerOccupied { .. } => "host_container_occupied",
            HostError::RootContainer => "host_root_container",
            HostError::SchedulerGone => "host_scheduler_gone",
            HostError::ReentrantTick => "host_reentrant_tick",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HostError::ContainerGone { container } => format!("gone: {container}"),
            HostError::ContainerOccupied { container } => format!("occupied: {container}"),
            other => other.to_string(),
        }
    }
}

/// # Errors produced by the frame driver.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configured frame budget ran out while tasks were still live.
    #[error("frame budget of {frames} exhausted; live: {live:?}")]
    FrameBudgetExceeded {
        /// The configured budget.
        frames: u64,
        /// Names of the tasks still live when the budget ran out.
        live: Vec<String>,
    },

    /// Installing the OS shutdown signal listener failed.
    #[error("signal listener failed: {0}")]
    Signal(#[from] std::io::Error),

    /// The host rejected a frame.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tickvisor::RuntimeError;
    ///
    /// let err = RuntimeError::FrameBudgetExceeded { frames: 10, live: vec![] };
    /// assert_eq!(err.as_label(), "runtime_frame_budget_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::FrameBudgetExceeded { .. } => "runtime_frame_budget_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
            RuntimeError::Host(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::FrameBudgetExceeded { frames, live } => {
                format!("budget exhausted after {frames} frames; live tasks={live:?}")
            }
            RuntimeError::Signal(e) => format!("signal: {e}"),
            RuntimeError::Host(e) => e.as_message(),
        }
    }
}
