//! # TrackedTask: a routine with an observable lifecycle.
//!
//! [`TrackedTask`] wraps a [`TaskRef`] with explicit `run`/`stop` control,
//! four subscribable events and optional self-destruction of its container.
//!
//! ## Lifecycle
//! ```text
//!            run()
//!   Idle ─────────────► Running ──── routine finished ──► Completed ─┐
//!    ▲    (Started)        │                                          │ destroy_on_complete
//!    │                     ├──── stop() ──────────────► Stopped ──────┤ destroy_on_stop
//!    │                     │                                          ▼
//!    │                     └──── container torn down ──► Destroyed   teardown (no event:
//!    │                                                                running is false)
//!    └──────────────── run() again (new run number) ◄──────────────────
//! ```
//!
//! ## Rules
//! - `Started` precedes exactly one terminal event per run; two terminal
//!   events never fire for the same run.
//! - `stop()` always fires `Stopped`, even when nothing is running.
//! - `Destroyed` fires only when the container disappears while running.
//! - `stop()` uses the scheduler's `stop_all(container)`: every task in the
//!   container is stopped, so the container must not be shared with
//!   unrelated tasks.
//! - The container owns the tracked task: the teardown hook keeps it alive
//!   until the container is destroyed, so fire-and-forget handles may be dropped.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tickvisor::{Event, EventKind, Scheduler, TaskFn, TrackedTask, Wait};
//!
//! let sched = Scheduler::default();
//! let task = TrackedTask::create(&sched, Some(TaskFn::rc("blink", || Wait::steps(2))), "blink", None).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let out = Rc::clone(&seen);
//! task.subscribe(EventKind::Completed, move |ev: &Event| out.borrow_mut().push(ev.kind));
//!
//! task.run().unwrap();
//! sched.tick().unwrap();
//! assert_eq!(*seen.borrow(), vec![EventKind::Completed]);
//! assert!(!sched.is_alive(task.container()));
//! ```

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::{ContainerId, Scheduler, TaskHandle, WeakScheduler};
use crate::error::HostError;
use crate::events::{Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet, Subscription};
use crate::tasks::{BoxRoutine, Frame, Routine, RoutineExt, Step, Task, TaskRef};

struct TrackedInner {
    name: Cow<'static, str>,
    scheduler: WeakScheduler,
    container: ContainerId,
    routine: RefCell<Option<TaskRef>>,
    running: Cell<bool>,
    /// Set while `Started` is being emitted; cleared by `stop()` or teardown.
    starting: Cell<bool>,
    destroy_on_complete: Cell<bool>,
    destroy_on_stop: Cell<bool>,
    /// Number of the current (or last) run; `0` before the first run.
    run: Cell<u64>,
    handle: RefCell<Option<TaskHandle>>,
    subscribers: SubscriberSet,
}

impl TrackedInner {
    fn emit(&self, kind: EventKind) {
        let frame = self.scheduler.upgrade().map_or(0, |s| s.frame());
        let run = self.run.get();
        tracing::debug!(task = %self.name, kind = kind.as_label(), run, frame, "lifecycle event");

        let ev = Event::new(kind)
            .with_task(&*self.name)
            .with_run(run)
            .with_frame(frame);
        self.subscribers.emit(&ev);
    }

    fn schedule_teardown(&self) {
        let Some(scheduler) = self.scheduler.upgrade() else {
            return;
        };
        if let Err(e) = scheduler.destroy(self.container, 0) {
            tracing::debug!(task = %self.name, error = e.as_label(), "container teardown skipped");
        }
    }

    fn on_complete(&self, run: u64) {
        if self.run.get() != run || !self.running.get() {
            return;
        }
        self.running.set(false);
        self.emit(EventKind::Completed);
        if self.destroy_on_complete.get() {
            self.schedule_teardown();
        }
    }

    fn on_teardown(&self) {
        if !self.running.get() && !self.starting.get() {
            return;
        }
        self.running.set(false);
        self.starting.set(false);
        self.emit(EventKind::Destroyed);
    }
}

/// Lifecycle-tracked wrapper around a routine factory.
///
/// Cloning yields another handle to the same tracked task.
#[derive(Clone)]
pub struct TrackedTask {
    inner: Rc<TrackedInner>,
}

impl TrackedTask {
    /// Builds a fresh container named `name` under `parent` (the root when
    /// `None`) and attaches a tracked task to it, without running it.
    ///
    /// Destroy flags default to the scheduler's [`Config`](crate::Config)
    /// (`destroy_on_complete = true`, `destroy_on_stop = false` unless changed).
    pub fn create(
        scheduler: &Scheduler,
        routine: Option<TaskRef>,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<Self, HostError> {
        let container = scheduler.create_container(name, parent)?;
        let task = Self::attach(scheduler, container, routine)?;
        let cfg = scheduler.config();
        task.set_destroy_on_complete(cfg.destroy_on_complete);
        task.set_destroy_on_stop(cfg.destroy_on_stop);
        Ok(task)
    }

    /// Attaches a tracked task to an existing container. Both destroy flags start `false`.
    ///
    /// ### Errors
    /// - [`HostError::ContainerGone`] if `container` is dead.
    /// - [`HostError::ContainerOccupied`] if it already hosts a tracked task.
    pub fn attach(
        scheduler: &Scheduler,
        container: ContainerId,
        routine: Option<TaskRef>,
    ) -> Result<Self, HostError> {
        scheduler.claim_tracked(container)?;
        let name = scheduler
            .container_name(container)
            .ok_or(HostError::ContainerGone { container })?;

        let task = Self {
            inner: Rc::new(TrackedInner {
                name: name.into(),
                scheduler: scheduler.downgrade(),
                container,
                routine: RefCell::new(routine),
                running: Cell::new(false),
                starting: Cell::new(false),
                destroy_on_complete: Cell::new(false),
                destroy_on_stop: Cell::new(false),
                run: Cell::new(0),
                handle: RefCell::new(None),
                subscribers: SubscriberSet::new(),
            }),
        };

        let inner = Rc::clone(&task.inner);
        scheduler.on_teardown(container, move || inner.on_teardown())?;
        Ok(task)
    }

    /// Starts a new run.
    ///
    /// - No routine set → `Ok(None)`, no event.
    /// - Already running → `Ok(Some(in-flight handle))`, no event.
    /// - Otherwise fires `Started`, marks the task running and starts a fresh
    ///   routine in the container. A routine that finishes on its first step
    ///   fires `Completed` before this returns.
    ///
    /// While `Started` is being delivered the run has no routine yet: a
    /// nested `run()` is a no-op returning `Ok(None)`, and a `stop()` or
    /// container teardown ends the run there (`Stopped` / `Destroyed`), in
    /// which case this returns `Ok(None)` without starting anything.
    ///
    /// ### Errors
    /// [`HostError::SchedulerGone`] / [`HostError::ContainerGone`]; no event fires.
    pub fn run(&self) -> Result<Option<TaskHandle>, HostError> {
        let Some(task) = self.inner.routine.borrow().clone() else {
            return Ok(None);
        };
        if self.inner.starting.get() {
            tracing::debug!(task = %self.inner.name, "run ignored: run is starting");
            return Ok(None);
        }
        if self.inner.running.get() {
            tracing::debug!(task = %self.inner.name, "run ignored: already running");
            return Ok(self.inner.handle.borrow().clone());
        }

        let scheduler = self
            .inner
            .scheduler
            .upgrade()
            .ok_or(HostError::SchedulerGone)?;
        let container = self.inner.container;
        if !scheduler.is_alive(container) {
            return Err(HostError::ContainerGone { container });
        }

        let run = self.inner.run.get() + 1;
        self.inner.run.set(run);
        self.inner.starting.set(true);
        self.inner.emit(EventKind::Started);
        if !self.inner.starting.replace(false) {
            tracing::debug!(task = %self.inner.name, run, "run ended while starting");
            return Ok(None);
        }
        self.inner.running.set(true);

        let inner = Rc::clone(&self.inner);
        let routine = task.spawn().then(move || inner.on_complete(run));
        match scheduler.start_named(container, self.inner.name.to_string(), routine) {
            Ok(handle) => {
                *self.inner.handle.borrow_mut() = Some(handle.clone());
                Ok(Some(handle))
            }
            Err(e) => {
                self.inner.running.set(false);
                Err(e)
            }
        }
    }

    /// Stops whatever runs in the container and fires `Stopped`.
    ///
    /// Fires on every call, running or not. Schedules container teardown when
    /// `destroy_on_stop` is set.
    pub fn stop(&self) {
        if let Some(scheduler) = self.inner.scheduler.upgrade() {
            scheduler.stop_all(self.inner.container);
        }
        self.inner.running.set(false);
        self.inner.starting.set(false);
        self.inner.emit(EventKind::Stopped);
        if self.inner.destroy_on_stop.get() {
            self.inner.schedule_teardown();
        }
    }

    /// `true` between `run()` and the run's terminal event.
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Number of runs started so far.
    pub fn runs(&self) -> u64 {
        self.inner.run.get()
    }

    /// Name (taken from the container).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The owning container.
    pub fn container(&self) -> ContainerId {
        self.inner.container
    }

    /// Handle of the latest run, if any.
    pub fn handle(&self) -> Option<TaskHandle> {
        self.inner.handle.borrow().clone()
    }

    /// The routine factory.
    pub fn routine(&self) -> Option<TaskRef> {
        self.inner.routine.borrow().clone()
    }

    /// Replaces the routine factory; takes effect on the next `run()`.
    pub fn set_routine(&self, routine: Option<TaskRef>) {
        *self.inner.routine.borrow_mut() = routine;
    }

    pub fn destroy_on_complete(&self) -> bool {
        self.inner.destroy_on_complete.get()
    }

    pub fn set_destroy_on_complete(&self, on: bool) {
        self.inner.destroy_on_complete.set(on);
    }

    pub fn destroy_on_stop(&self) -> bool {
        self.inner.destroy_on_stop.get()
    }

    pub fn set_destroy_on_stop(&self, on: bool) {
        self.inner.destroy_on_stop.set(on);
    }

    /// Subscribes to one lifecycle event.
    pub fn subscribe(&self, kind: EventKind, sub: impl Subscribe) -> Subscription {
        self.inner.subscribers.subscribe(kind, sub)
    }

    /// Subscribes one shared subscriber to all four events.
    pub fn subscribe_all(&self, sub: Rc<dyn Subscribe>) -> [Subscription; 4] {
        EventKind::ALL.map(|kind| self.inner.subscribers.subscribe_rc(kind, Rc::clone(&sub)))
    }

    /// Removes a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        self.inner.subscribers.unsubscribe(token)
    }
}

impl fmt::Debug for TrackedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedTask")
            .field("name", &self.inner.name)
            .field("container", &self.inner.container)
            .field("running", &self.inner.running.get())
            .field("runs", &self.inner.run.get())
            .finish()
    }
}

/// Routine behind `Task for TrackedTask`: runs once, waits for the run to end.
struct RunTracked {
    task: TrackedTask,
    run: Option<u64>,
}

impl Routine for RunTracked {
    fn step(&mut self, _frame: &mut Frame<'_>) -> Step {
        let run = match self.run {
            Some(run) => run,
            None => match self.task.run() {
                Ok(Some(_)) => {
                    let run = self.task.runs();
                    self.run = Some(run);
                    run
                }
                Ok(None) => return Step::Done,
                Err(e) => {
                    tracing::warn!(
                        task = %self.task.name(),
                        error = e.as_label(),
                        "tracked task could not run"
                    );
                    return Step::Done;
                }
            },
        };

        if self.task.is_running() && self.task.runs() == run {
            Step::Yield
        } else {
            Step::Done
        }
    }
}

/// A tracked task can be a [`JoinAll`](crate::JoinAll) member: the member
/// finishes when the run ends, whichever terminal event ends it.
///
/// If the task was already running when the member started, the member joins
/// that run. The run's routine is then older than the member and is stepped
/// after it within a frame, so the member observes a natural completion one
/// frame late.
impl Task for TrackedTask {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn spawn(&self) -> BoxRoutine {
        RunTracked {
            task: self.clone(),
            run: None,
        }
        .boxed()
    }
}
