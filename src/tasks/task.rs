//! # Task abstraction: a named routine factory.
//!
//! A [`Task`] does not run anything by itself. Every call to [`Task::spawn`]
//! produces a **fresh** [`Routine`](super::Routine), so the same task can be
//! started any number of times (each member of a join, each run of a tracked
//! task).
//!
//! The common handle type is [`TaskRef`], an `Rc<dyn Task>` suitable for
//! sharing on the scheduler thread.

use std::rc::Rc;

use super::routine::BoxRoutine;

/// # Routine factory.
///
/// # Example
/// ```
/// use tickvisor::{BoxRoutine, RoutineExt, Task, Wait};
///
/// struct Blink;
///
/// impl Task for Blink {
///     fn name(&self) -> &str { "blink" }
///
///     fn spawn(&self) -> BoxRoutine {
///         Wait::steps(10).boxed()
///     }
/// }
/// ```
pub trait Task: 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates a new routine for one execution of the task.
    fn spawn(&self) -> BoxRoutine;
}

/// Shared handle to a task.
pub type TaskRef = Rc<dyn Task>;
