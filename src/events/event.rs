//! # Lifecycle events emitted by tracked tasks.
//!
//! The [`EventKind`] enum classifies the four transitions of a
//! [`TrackedTask`](crate::TrackedTask) run:
//! - **Opening event**: [`EventKind::Started`]
//! - **Terminal events**: [`EventKind::Completed`], [`EventKind::Stopped`], [`EventKind::Destroyed`]
//!
//! The [`Event`] struct carries the metadata: timestamps, task name, run number
//! and the frame the transition happened in.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Within one run, `Started` always precedes exactly one terminal event.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Started)
//!     .with_task("spawn-wave")
//!     .with_run(2)
//!     .with_frame(40);
//!
//! assert_eq!(ev.kind, EventKind::Started);
//! assert_eq!(ev.task.as_deref(), Some("spawn-wave"));
//! assert_eq!(ev.run, 2);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `run()` is about to start the wrapped routine.
    ///
    /// Sets:
    /// - `task`: tracked task name
    /// - `run`: run number (1-based, per tracked task)
    /// - `frame`: scheduler frame
    Started,

    /// `stop()` was called.
    ///
    /// Fired on every `stop()`, including when nothing is running.
    /// Sets the same fields as `Started`.
    Stopped,

    /// The wrapped routine finished on its own.
    ///
    /// Sets the same fields as `Started`.
    Completed,

    /// The container was torn down while the routine was still running.
    ///
    /// Sets the same fields as `Started`.
    Destroyed,
}

impl EventKind {
    /// All kinds, in lifecycle order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Started,
        EventKind::Stopped,
        EventKind::Completed,
        EventKind::Destroyed,
    ];

    /// Returns `true` for the kinds that end a run.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, EventKind::Started)
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::Stopped => "stopped",
            EventKind::Completed => "completed",
            EventKind::Destroyed => "destroyed",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EventKind::Started => 0,
            EventKind::Stopped => 1,
            EventKind::Completed => 2,
            EventKind::Destroyed => 3,
        }
    }
}

/// Lifecycle event with metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the tracked task, if applicable.
    pub task: Option<Arc<str>>,
    /// Run number the event belongs to (`0` = no run has started yet).
    pub run: u64,
    /// Scheduler frame the transition happened in.
    pub frame: u64,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            run: 0,
            frame: 0,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a run number.
    #[inline]
    pub fn with_run(mut self, run: u64) -> Self {
        self.run = run;
        self
    }

    /// Attaches a frame number.
    #[inline]
    pub fn with_frame(mut self, frame: u64) -> Self {
        self.frame = frame;
        self
    }
}
