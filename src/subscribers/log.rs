//! # LogWriter: lifecycle event logger
//!
//! A minimal subscriber that writes incoming [`Event`]s through `tracing`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO [started] task="wave" run=1 frame=12
//! INFO [completed] task="wave" run=1 frame=15
//! WARN [destroyed] task="wave" run=2 frame=40
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unnamed");
        match e.kind {
            EventKind::Started => {
                tracing::info!("[started] task={task:?} run={} frame={}", e.run, e.frame);
            }
            EventKind::Completed => {
                tracing::info!("[completed] task={task:?} run={} frame={}", e.run, e.frame);
            }
            EventKind::Stopped => {
                tracing::info!("[stopped] task={task:?} run={} frame={}", e.run, e.frame);
            }
            EventKind::Destroyed => {
                tracing::warn!("[destroyed] task={task:?} run={} frame={}", e.run, e.frame);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
