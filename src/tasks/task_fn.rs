//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn() -> R`, producing a fresh routine per
//! spawn. Spawns share no hidden state; if state must be shared, capture an
//! `Rc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use tickvisor::{FutureRoutine, TaskFn, TaskRef, Wait, next_frame};
//!
//! let blink: TaskRef = TaskFn::rc("blink", || Wait::steps(3));
//! assert_eq!(blink.name(), "blink");
//!
//! let fade: TaskRef = TaskFn::rc("fade", || FutureRoutine::new(async {
//!     next_frame().await;
//! }));
//! assert_eq!(fade.name(), "fade");
//! ```

use std::borrow::Cow;
use std::rc::Rc;

use super::routine::{BoxRoutine, Routine};
use super::task::Task;

/// Function-backed task implementation.
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::rc`] when you immediately need a [`TaskRef`](super::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn rc(name: impl Into<Cow<'static, str>>, f: F) -> Rc<Self> {
        Rc::new(Self::new(name, f))
    }
}

impl<F, R> Task for TaskFn<F>
where
    F: Fn() -> R + 'static, // Fn, not FnMut
    R: Routine,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self) -> BoxRoutine {
        Box::new((self.f)())
    }
}
