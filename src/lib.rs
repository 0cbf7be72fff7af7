//! # tickvisor
//!
//! **Tickvisor** is a small cooperative task host for frame-stepped programs
//! (games, simulations, UI loops).
//!
//! Work is written as [`Routine`]s: resumable state machines that advance one
//! step per frame and never block. A single-threaded [`Scheduler`] owns the
//! running routines and a tree of containers whose teardown stops everything
//! inside. On top of that the crate provides two building blocks:
//! - [`JoinAll`]: runs many tasks concurrently and finishes once all of them have;
//! - [`TrackedTask`]: wraps a routine with `run`/`stop` control, lifecycle
//!   events and optional self-destruction of its container.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskRef    │   │   JoinAll    │   │ TrackedTask  │
//!     │ (factory #1) │   │ (composite)  │   │ (lifecycle)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (single-threaded host)                                 │
//! │  - task slots keyed by TaskId (stepped newest-first)              │
//! │  - container tree (teardown hooks, deferred destruction)          │
//! └──────┬───────────────────────────────────────────────────┬────────┘
//!        │ tick()                                            │ teardown
//!        ▼                                                   ▼
//! ┌──────────────┐                                  ┌──────────────────┐
//! │    Driver    │                                  │  SubscriberSet   │
//! │ (tokio clock)│                                  │ Started/Stopped/ │
//! └──────────────┘                                  │ Completed/Destr. │
//!                                                   └──────────────────┘
//! ```
//!
//! ### Frame
//! ```text
//! tick()
//!   ├─► frame += 1
//!   ├─► step each live routine once (newest first; tasks started now wait)
//!   │       ├─ Yield ─► keep slot
//!   │       └─ Done  ─► release slot, run continuation
//!   └─► tear down containers whose destruction is due
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Routines**      | Frame-stepped units of work and ready-made helpers.          | [`Routine`], [`Step`], [`Wait`], [`FutureRoutine`] |
//! | **Tasks**         | Named routine factories.                                     | [`Task`], [`TaskRef`], [`TaskFn`]           |
//! | **Host**          | Scheduler, containers, frame driver.                         | [`Scheduler`], [`ContainerId`], [`Driver`]  |
//! | **Composition**   | Wait for a set of tasks.                                     | [`JoinAll`]                                 |
//! | **Lifecycle**     | Observable run/stop with self-destroying containers.         | [`TrackedTask`], [`Subscribe`], [`Event`]   |
//! | **Errors**        | Typed host and runtime errors.                               | [`HostError`], [`RuntimeError`]             |
//! | **Configuration** | Frame period, frame budget, tracked-task defaults.           | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use tickvisor::{JoinAll, Scheduler, TaskFn, TaskRef, Wait};
//!
//! let sched = Scheduler::default();
//! let members: Vec<TaskRef> = vec![
//!     TaskFn::rc("short", || Wait::steps(1)) as TaskRef,
//!     TaskFn::rc("medium", || Wait::steps(2)) as TaskRef,
//!     TaskFn::rc("long", || Wait::steps(3)) as TaskRef,
//! ];
//! let join = JoinAll::new(members, &sched);
//! let handle = sched.start(sched.root(), join.clone()).unwrap();
//!
//! assert_eq!(join.remaining(), Some(2));
//! sched.tick().unwrap();
//! assert_eq!(join.remaining(), Some(1));
//! sched.tick().unwrap();
//! assert!(handle.is_finished());
//! ```
mod config;
mod core;
mod error;
mod events;
mod join;
mod subscribers;
mod tasks;
mod tracked;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    ContainerId, DriveReport, Driver, Scheduler, TaskHandle, TaskId, TaskState, TickReport,
    WeakScheduler,
};
pub use error::{HostError, RuntimeError};
pub use events::{Event, EventKind};
pub use join::{JoinAll, StartOutcome};
pub use subscribers::{Subscribe, SubscriberSet, Subscription};
pub use tasks::{
    BoxRoutine, Frame, FutureRoutine, Routine, RoutineExt, RoutineFn, Step, Task, TaskFn,
    TaskRef, Then, Wait, next_frame,
};
pub use tracked::TrackedTask;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
