//! Task identity and observable state.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Identifier of a started task. Larger ids were started later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Observable state of a started task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Still registered with the scheduler.
    Running,
    /// The routine returned [`Step::Done`](crate::Step::Done).
    Finished,
    /// Removed by `stop`, `stop_all` or container teardown before finishing.
    Stopped,
}

/// Handle returned by [`Scheduler::start`](crate::Scheduler::start).
///
/// Dropping the handle does **not** stop the task; it only discards the
/// ability to observe it.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub(crate) id: TaskId,
    pub(crate) state: Rc<Cell<TaskState>>,
}

impl TaskHandle {
    /// The task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// `true` once the task finished or was stopped.
    pub fn is_finished(&self) -> bool {
        self.state.get() != TaskState::Running
    }
}
