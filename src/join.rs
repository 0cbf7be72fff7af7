//! # JoinAll: wait for every member task.
//!
//! [`JoinAll`] turns a fixed set of [`TaskRef`]s into one composite routine.
//! On its first step the composite starts every member under its own
//! container, then yields frame after frame until the last member finishes.
//!
//! ## Flow
//! ```text
//! step #1 ─► start_all()
//!              ├─► remaining = |members|
//!              └─► for each member: scheduler.start(member.spawn().then(remaining -= 1))
//! step #n ─► remaining > 0 ? Yield : Done
//! ```
//!
//! ## Rules
//! - Members run independently; completion order is whatever the frames produce.
//! - The composite finishes in the same frame as its slowest member: members
//!   are newer tasks, so they step before the composite.
//! - `remaining` goes `|members| → 0`, one decrement per member, never below 0.
//! - `start_all` is a no-op once started; a finished combinator stays finished.
//! - Duplicate members are started and counted once per entry.
//! - No cancellation propagation: stopping the composite's handle leaves
//!   started members running. Stopping (or destroying) the shared container
//!   stops both.
//! - No timeout: a member that never finishes keeps the composite waiting.
//!
//! ## Example
//! ```rust
//! use tickvisor::{JoinAll, Scheduler, TaskFn, TaskRef, Wait};
//!
//! let sched = Scheduler::default();
//! let members: Vec<TaskRef> = vec![
//!     TaskFn::rc("short", || Wait::steps(1)) as TaskRef,
//!     TaskFn::rc("long", || Wait::steps(3)) as TaskRef,
//! ];
//! let join = JoinAll::new(members, &sched);
//!
//! let handle = sched.start(sched.root(), join.clone()).unwrap();
//! assert_eq!(join.remaining(), Some(1));
//!
//! sched.tick().unwrap();
//! sched.tick().unwrap();
//! assert!(handle.is_finished());
//! assert_eq!(join.remaining(), Some(0));
//! ```

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::core::{ContainerId, Scheduler, WeakScheduler};
use crate::error::HostError;
use crate::tasks::{BoxRoutine, Frame, Routine, RoutineExt, Step, Task, TaskRef};

/// Result of [`JoinAll::start_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Members were started by this call.
    Started,
    /// Members were already started and some are still running; nothing done.
    AlreadyRunning,
    /// Every member already finished; nothing done.
    Finished,
}

struct JoinInner {
    name: Cow<'static, str>,
    members: Box<[TaskRef]>,
    scheduler: WeakScheduler,
    /// `None` until started.
    remaining: Cell<Option<usize>>,
}

impl JoinInner {
    fn finish_one(&self) {
        if let Some(n) = self.remaining.get() {
            let left = n.saturating_sub(1);
            self.remaining.set(Some(left));
            tracing::trace!(join = %self.name, remaining = left, "join member finished");
        }
    }
}

/// Composite task that finishes once all of its members have finished.
///
/// Cloning shares state: every clone observes the same counter, and
/// [`Task::spawn`] hands out such a clone, so a combinator runs at most once.
#[derive(Clone)]
pub struct JoinAll {
    inner: Rc<JoinInner>,
}

impl JoinAll {
    /// Creates a combinator over `members`, starting them through `scheduler`.
    pub fn new(members: impl IntoIterator<Item = TaskRef>, scheduler: &Scheduler) -> Self {
        Self::named("join", members, scheduler)
    }

    /// Like [`new`](Self::new), with a name used when the combinator is itself a member.
    pub fn named(
        name: impl Into<Cow<'static, str>>,
        members: impl IntoIterator<Item = TaskRef>,
        scheduler: &Scheduler,
    ) -> Self {
        Self {
            inner: Rc::new(JoinInner {
                name: name.into(),
                members: members.into_iter().collect(),
                scheduler: scheduler.downgrade(),
                remaining: Cell::new(None),
            }),
        }
    }

    /// Number of members (duplicates included).
    pub fn len(&self) -> usize {
        self.inner.members.len()
    }

    /// `true` if there are no members.
    pub fn is_empty(&self) -> bool {
        self.inner.members.is_empty()
    }

    /// Members not yet finished; `None` before [`start_all`](Self::start_all).
    pub fn remaining(&self) -> Option<usize> {
        self.inner.remaining.get()
    }

    /// `true` once started.
    pub fn is_started(&self) -> bool {
        self.inner.remaining.get().is_some()
    }

    /// `true` once every member has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.remaining.get() == Some(0)
    }

    /// Starts every member under `container`.
    ///
    /// Each member's first step runs inside this call, so members that need a
    /// single step are already counted off when it returns.
    ///
    /// ### Errors
    /// - [`HostError::SchedulerGone`] if the scheduler was dropped (nothing started).
    /// - [`HostError::ContainerGone`] if `container` is dead (nothing started), or
    ///   disappeared during the fan-out (the remaining members are not started
    ///   and the combinator never finishes).
    pub fn start_all(&self, container: ContainerId) -> Result<StartOutcome, HostError> {
        match self.inner.remaining.get() {
            Some(0) => return Ok(StartOutcome::Finished),
            Some(_) => return Ok(StartOutcome::AlreadyRunning),
            None => {}
        }

        let scheduler = self
            .inner
            .scheduler
            .upgrade()
            .ok_or(HostError::SchedulerGone)?;
        if !scheduler.is_alive(container) {
            return Err(HostError::ContainerGone { container });
        }

        self.inner.remaining.set(Some(self.inner.members.len()));
        tracing::debug!(
            join = %self.inner.name,
            members = self.inner.members.len(),
            %container,
            "join starting members"
        );

        for member in self.inner.members.iter() {
            let inner = Rc::clone(&self.inner);
            let routine = member.spawn().then(move || inner.finish_one());
            scheduler.start_named(container, member.name().to_owned(), routine)?;
        }
        Ok(StartOutcome::Started)
    }
}

impl Routine for JoinAll {
    fn step(&mut self, frame: &mut Frame<'_>) -> Step {
        if !self.is_started() {
            if let Err(e) = self.start_all(frame.container()) {
                tracing::error!(
                    join = %self.inner.name,
                    error = e.as_label(),
                    "join could not start its members"
                );
                return Step::Yield;
            }
        }
        if self.is_finished() {
            Step::Done
        } else {
            Step::Yield
        }
    }
}

impl Task for JoinAll {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn spawn(&self) -> BoxRoutine {
        Box::new(self.clone())
    }
}

impl fmt::Debug for JoinAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinAll")
            .field("name", &self.inner.name)
            .field("members", &self.inner.members.len())
            .field("remaining", &self.inner.remaining.get())
            .finish()
    }
}
