//! # Routine and task abstractions.
//!
//! This module provides the suspendable-task primitive:
//! - [`Routine`] - resumable state machine stepped once per frame
//! - [`Step`] - outcome of one step (`Yield` / `Done`)
//! - [`Frame`] - per-step view of the host
//! - [`Task`] - named routine factory; [`TaskRef`] is `Rc<dyn Task>`
//! - [`TaskFn`] - closure-backed task
//! - [`Wait`], [`RoutineFn`], [`FutureRoutine`] - ready-made routines

mod future;
mod routine;
mod task;
mod task_fn;
mod wait;

pub use future::{FutureRoutine, next_frame};
pub use routine::{BoxRoutine, Frame, Routine, RoutineExt, Step, Then};
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
pub use wait::{RoutineFn, Wait};
