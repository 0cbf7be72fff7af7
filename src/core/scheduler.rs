//! # Scheduler: the frame-stepped host.
//!
//! The [`Scheduler`] owns every started routine and the container tree. It is a
//! cheap, cloneable, single-threaded handle (`Rc` inside); combinators and
//! tracked tasks keep a [`WeakScheduler`] so they never extend its lifetime.
//!
//! ## Frame model
//! ```text
//! start(container, routine)
//!   ├─► register slot (Running)
//!   ├─► step #1 (synchronously, inside start)
//!   └─► Done ─► Finished        Yield ─► parked until next tick
//!
//! tick()
//!   ├─► frame += 1
//!   ├─► snapshot live tasks, newest first
//!   ├─► step each one exactly once (skip if stopped meanwhile)
//!   └─► flush container destructions due this frame
//! ```
//!
//! ## Rules
//! - Single thread, no preemption: a routine runs until it returns a [`Step`].
//! - Tasks are stepped **newest first**, so work started by a parent settles
//!   before the parent resumes in the same frame.
//! - A task started during a frame has already taken its step for that frame.
//! - `stop`/`stop_all` drop the routine without completing it; any
//!   [`then`](crate::RoutineExt::then) continuation is discarded.
//! - Teardown hooks of a container run exactly once.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::Config;
use crate::error::HostError;
use crate::tasks::{BoxRoutine, Frame, Routine, Step, Task};

use super::container::{ContainerId, Containers, Detached};
use super::handle::{TaskHandle, TaskId, TaskState};

struct Slot {
    name: Cow<'static, str>,
    container: ContainerId,
    /// `None` while the routine is being stepped.
    routine: Option<BoxRoutine>,
    state: Rc<Cell<TaskState>>,
}

struct PendingDestroy {
    container: ContainerId,
    due: u64,
}

struct Core {
    frame: u64,
    next_task: u64,
    tasks: BTreeMap<TaskId, Slot>,
    containers: Containers,
    pending: Vec<PendingDestroy>,
    ticking: bool,
}

struct Shared {
    cfg: Config,
    core: RefCell<Core>,
}

/// What one [`Scheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number that was just advanced.
    pub frame: u64,
    /// Tasks stepped during the frame (first steps inside `start` excluded).
    pub stepped: usize,
    /// Tasks that finished during the frame (first steps inside `start` excluded).
    pub finished: usize,
    /// Containers torn down at the end of the frame (descendants included).
    pub destroyed: usize,
    /// Tasks still live after the frame.
    pub live: usize,
}

/// Frame-stepped cooperative scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Shared>,
}

/// Non-owning reference to a [`Scheduler`].
#[derive(Clone)]
pub struct WeakScheduler {
    inner: Weak<Shared>,
}

impl WeakScheduler {
    /// Returns the scheduler if it is still alive.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }
}

impl fmt::Debug for WeakScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScheduler")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Resets the ticking flag even if a routine panics mid-frame.
struct TickGuard<'a>(&'a Scheduler);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.inner.core.borrow_mut().ticking = false;
    }
}

impl Scheduler {
    /// Creates a scheduler with only the root container.
    pub fn new(cfg: Config) -> Self {
        let core = Core {
            frame: 0,
            next_task: 1,
            tasks: BTreeMap::new(),
            containers: Containers::new(),
            pending: Vec::new(),
            ticking: false,
        };
        Self {
            inner: Rc::new(Shared {
                cfg,
                core: RefCell::new(core),
            }),
        }
    }

    /// The configuration this scheduler was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Returns a non-owning reference.
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The root container.
    pub fn root(&self) -> ContainerId {
        ContainerId::ROOT
    }

    /// Number of frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.inner.core.borrow().frame
    }

    /// Number of tasks still registered.
    pub fn live_tasks(&self) -> usize {
        self.inner.core.borrow().tasks.len()
    }

    /// Names of the tasks still registered, oldest first.
    pub fn live_names(&self) -> Vec<String> {
        self.inner
            .core
            .borrow()
            .tasks
            .values()
            .map(|s| s.name.to_string())
            .collect()
    }

    /// `true` when no task is live and no container destruction is pending.
    pub fn is_idle(&self) -> bool {
        let core = self.inner.core.borrow();
        core.tasks.is_empty() && core.pending.is_empty()
    }

    // ---------------------------
    // Tasks
    // ---------------------------

    /// Starts `routine` under `container`.
    ///
    /// The first step runs before this returns; a routine that finishes on
    /// its first step yields a handle that is already finished.
    pub fn start<R: Routine>(
        &self,
        container: ContainerId,
        routine: R,
    ) -> Result<TaskHandle, HostError> {
        self.start_named(container, std::any::type_name::<R>(), routine)
    }

    /// Like [`start`](Self::start), with an explicit name for logs and
    /// [`live_names`](Self::live_names).
    pub fn start_named<R: Routine>(
        &self,
        container: ContainerId,
        name: impl Into<Cow<'static, str>>,
        routine: R,
    ) -> Result<TaskHandle, HostError> {
        self.start_boxed(container, name.into(), Box::new(routine))
    }

    /// Spawns a fresh routine from `task` and starts it under `container`.
    pub fn spawn(&self, container: ContainerId, task: &dyn Task) -> Result<TaskHandle, HostError> {
        self.start_boxed(container, Cow::Owned(task.name().to_owned()), task.spawn())
    }

    fn start_boxed(
        &self,
        container: ContainerId,
        name: Cow<'static, str>,
        routine: BoxRoutine,
    ) -> Result<TaskHandle, HostError> {
        let handle = {
            let mut core = self.inner.core.borrow_mut();
            if !core.containers.contains(container) {
                return Err(HostError::ContainerGone { container });
            }
            let id = TaskId(core.next_task);
            core.next_task += 1;

            let state = Rc::new(Cell::new(TaskState::Running));
            tracing::debug!(task = %id, name = %name, %container, "task started");
            core.tasks.insert(
                id,
                Slot {
                    name,
                    container,
                    routine: None,
                    state: Rc::clone(&state),
                },
            );
            TaskHandle { id, state }
        };

        if self.run_step(handle.id, container, routine).is_done() {
            tracing::trace!(task = %handle.id, "task finished on its first step");
        }
        Ok(handle)
    }

    /// Steps `routine` once and puts it back (or retires it).
    fn run_step(&self, id: TaskId, container: ContainerId, mut routine: BoxRoutine) -> Step {
        let number = self.frame();
        let step = {
            let mut frame = Frame::new(self, container, id, number);
            routine.step(&mut frame)
        };

        let leftover = {
            let mut core = self.inner.core.borrow_mut();
            if !core.tasks.contains_key(&id) {
                // Stopped while stepping.
                Some(routine)
            } else if step.is_done() {
                if let Some(slot) = core.tasks.remove(&id) {
                    slot.state.set(TaskState::Finished);
                    tracing::trace!(task = %id, name = %slot.name, "task finished");
                }
                Some(routine)
            } else {
                if let Some(slot) = core.tasks.get_mut(&id) {
                    slot.routine = Some(routine);
                }
                None
            }
        };
        drop(leftover);
        step
    }

    /// Stops one task. Returns `false` if it was no longer running.
    pub fn stop(&self, handle: &TaskHandle) -> bool {
        let removed = {
            let mut core = self.inner.core.borrow_mut();
            core.tasks.remove(&handle.id)
        };
        match removed {
            Some(slot) => {
                slot.state.set(TaskState::Stopped);
                tracing::debug!(task = %handle.id, name = %slot.name, "task stopped");
                true
            }
            None => false,
        }
    }

    /// Stops every task directly owned by `container`. Returns how many were stopped.
    ///
    /// Tasks owned by child containers keep running.
    pub fn stop_all(&self, container: ContainerId) -> usize {
        let removed = {
            let mut core = self.inner.core.borrow_mut();
            Self::take_tasks(&mut core, |c| c == container)
        };
        let n = removed.len();
        for slot in &removed {
            slot.state.set(TaskState::Stopped);
        }
        if n > 0 {
            tracing::debug!(%container, stopped = n, "stopped all tasks of container");
        }
        n
    }

    fn take_tasks(core: &mut Core, mut owned: impl FnMut(ContainerId) -> bool) -> Vec<Slot> {
        let ids: Vec<TaskId> = core
            .tasks
            .iter()
            .filter(|(_, s)| owned(s.container))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| core.tasks.remove(&id))
            .collect()
    }

    /// Advances one frame.
    pub fn tick(&self) -> Result<TickReport, HostError> {
        let (frame, ids) = {
            let mut core = self.inner.core.borrow_mut();
            if core.ticking {
                return Err(HostError::ReentrantTick);
            }
            core.ticking = true;
            core.frame += 1;
            let ids: Vec<TaskId> = core.tasks.keys().rev().copied().collect();
            (core.frame, ids)
        };
        let _guard = TickGuard(self);

        let mut report = TickReport {
            frame,
            stepped: 0,
            finished: 0,
            destroyed: 0,
            live: 0,
        };

        for id in ids {
            let taken = {
                let mut core = self.inner.core.borrow_mut();
                core.tasks
                    .get_mut(&id)
                    .and_then(|slot| slot.routine.take().map(|r| (slot.container, r)))
            };
            let Some((container, routine)) = taken else {
                continue;
            };
            report.stepped += 1;
            if self.run_step(id, container, routine).is_done() {
                report.finished += 1;
            }
        }

        report.destroyed = self.flush_destroys(frame);
        report.live = self.live_tasks();
        tracing::trace!(
            frame,
            stepped = report.stepped,
            finished = report.finished,
            live = report.live,
            "frame advanced"
        );
        Ok(report)
    }

    // ---------------------------
    // Containers
    // ---------------------------

    /// Creates an empty container under `parent` (the root when `None`).
    pub fn create_container(
        &self,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<ContainerId, HostError> {
        let parent = parent.unwrap_or(ContainerId::ROOT);
        let id = self
            .inner
            .core
            .borrow_mut()
            .containers
            .create(name, parent)?;
        tracing::debug!(container = %id, name, %parent, "container created");
        Ok(id)
    }

    /// `true` while `container` has not been torn down.
    pub fn is_alive(&self, container: ContainerId) -> bool {
        self.inner.core.borrow().containers.contains(container)
    }

    /// Name of a live container.
    pub fn container_name(&self, container: ContainerId) -> Option<String> {
        self.inner
            .core
            .borrow()
            .containers
            .name(container)
            .map(str::to_owned)
    }

    /// Parent of a live container.
    pub fn parent_of(&self, container: ContainerId) -> Option<ContainerId> {
        self.inner.core.borrow().containers.parent(container)
    }

    /// Live children of a container, in creation order.
    pub fn children_of(&self, container: ContainerId) -> Vec<ContainerId> {
        self.inner.core.borrow().containers.children(container)
    }

    /// Registers `hook` to run when `container` is torn down.
    pub fn on_teardown(
        &self,
        container: ContainerId,
        hook: impl FnOnce() + 'static,
    ) -> Result<(), HostError> {
        self.inner
            .core
            .borrow_mut()
            .containers
            .add_hook(container, Box::new(hook))
    }

    pub(crate) fn claim_tracked(&self, container: ContainerId) -> Result<(), HostError> {
        self.inner
            .core
            .borrow_mut()
            .containers
            .claim_tracked(container)
    }

    /// Schedules teardown of `container` at the end of frame `current + delay_frames`.
    ///
    /// Called outside a frame, `delay_frames = 0` means "at the end of the
    /// next frame". Repeated requests keep the earliest deadline.
    pub fn destroy(&self, container: ContainerId, delay_frames: u64) -> Result<(), HostError> {
        let mut core = self.inner.core.borrow_mut();
        if container == ContainerId::ROOT {
            return Err(HostError::RootContainer);
        }
        if !core.containers.contains(container) {
            return Err(HostError::ContainerGone { container });
        }

        let due = core.frame.saturating_add(delay_frames);
        match core.pending.iter_mut().find(|p| p.container == container) {
            Some(p) => p.due = p.due.min(due),
            None => core.pending.push(PendingDestroy { container, due }),
        }
        tracing::debug!(%container, due, "container destruction scheduled");
        Ok(())
    }

    /// Tears `container` (and its subtree) down immediately.
    ///
    /// For each container, children first: its tasks are stopped, then its
    /// teardown hooks run.
    pub fn destroy_now(&self, container: ContainerId) -> Result<usize, HostError> {
        let (detached, stopped) = {
            let mut core = self.inner.core.borrow_mut();
            let detached = core.containers.detach_subtree(container)?;
            let ids: Vec<ContainerId> = detached.iter().map(|d| d.id).collect();
            core.pending.retain(|p| !ids.contains(&p.container));
            let stopped = Self::take_tasks(&mut core, |c| ids.contains(&c));
            (detached, stopped)
        };

        for slot in &stopped {
            slot.state.set(TaskState::Stopped);
        }

        let n = detached.len();
        for Detached { id, name, hooks } in detached {
            tracing::debug!(container = %id, name = %name, "container destroyed");
            for hook in hooks {
                hook();
            }
        }
        drop(stopped);
        Ok(n)
    }

    /// Runs every destruction due by `frame`, including ones requested by hooks.
    fn flush_destroys(&self, frame: u64) -> usize {
        let mut destroyed = 0;
        loop {
            let due: Vec<ContainerId> = {
                let mut core = self.inner.core.borrow_mut();
                let (due, later): (Vec<_>, Vec<_>) =
                    core.pending.drain(..).partition(|p| p.due <= frame);
                core.pending = later;
                due.into_iter().map(|p| p.container).collect()
            };
            if due.is_empty() {
                return destroyed;
            }
            for container in due {
                // A parent flushed earlier may already have taken this one.
                if let Ok(n) = self.destroy_now(container) {
                    destroyed += n;
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.borrow();
        f.debug_struct("Scheduler")
            .field("frame", &core.frame)
            .field("live_tasks", &core.tasks.len())
            .field("containers", &core.containers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{FutureRoutine, RoutineExt, RoutineFn, Wait, next_frame};

    fn ticks(s: &Scheduler, n: usize) {
        for _ in 0..n {
            s.tick().unwrap();
        }
    }

    #[test]
    fn first_step_runs_inside_start() {
        let s = Scheduler::default();
        let h = s.start(s.root(), Wait::immediate()).unwrap();
        assert_eq!(h.state(), TaskState::Finished);
        assert_eq!(s.live_tasks(), 0);
    }

    #[test]
    fn k_step_routine_finishes_on_tick_k_minus_one() {
        let s = Scheduler::default();
        let h = s.start(s.root(), Wait::steps(3)).unwrap();
        ticks(&s, 1);
        assert!(!h.is_finished());
        let report = s.tick().unwrap();
        assert!(h.is_finished());
        assert_eq!(report.finished, 1);
        assert_eq!(report.live, 0);
    }

    #[test]
    fn newest_task_steps_first() {
        let s = Scheduler::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["old", "new"] {
            let o = Rc::clone(&order);
            s.start(
                s.root(),
                RoutineFn::new(move |_| {
                    o.borrow_mut().push(tag);
                    Step::Yield
                }),
            )
            .unwrap();
        }
        order.borrow_mut().clear();
        s.tick().unwrap();
        assert_eq!(*order.borrow(), vec!["new", "old"]);
    }

    #[test]
    fn task_started_mid_frame_is_not_stepped_twice() {
        let s = Scheduler::default();
        let child_steps = Rc::new(Cell::new(0));
        let c = Rc::clone(&child_steps);
        let mut spawned = false;
        s.start(
            s.root(),
            RoutineFn::new(move |frame| {
                if frame.number() == 1 && !spawned {
                    spawned = true;
                    let c = Rc::clone(&c);
                    frame
                        .scheduler()
                        .start(
                            frame.container(),
                            RoutineFn::new(move |_| {
                                c.set(c.get() + 1);
                                Step::Yield
                            }),
                        )
                        .unwrap();
                }
                Step::Yield
            }),
        )
        .unwrap();

        s.tick().unwrap();
        assert_eq!(child_steps.get(), 1);
        s.tick().unwrap();
        assert_eq!(child_steps.get(), 2);
    }

    #[test]
    fn stop_discards_continuation() {
        let s = Scheduler::default();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let h = s
            .start(s.root(), Wait::steps(2).then(move || f.set(true)))
            .unwrap();
        assert!(s.stop(&h));
        assert!(!s.stop(&h));
        ticks(&s, 3);
        assert_eq!(h.state(), TaskState::Stopped);
        assert!(!fired.get());
    }

    #[test]
    fn routine_can_stop_itself() {
        let s = Scheduler::default();
        let h = s
            .start(
                s.root(),
                RoutineFn::new(|frame| {
                    if frame.number() == 1 {
                        frame.scheduler().stop_all(frame.container());
                    }
                    Step::Yield
                }),
            )
            .unwrap();
        s.tick().unwrap();
        assert_eq!(h.state(), TaskState::Stopped);
        assert_eq!(s.live_tasks(), 0);
    }

    #[test]
    fn stop_all_only_touches_direct_tasks() {
        let s = Scheduler::default();
        let parent = s.create_container("parent", None).unwrap();
        let child = s.create_container("child", Some(parent)).unwrap();
        let a = s.start(parent, Wait::steps(5)).unwrap();
        let b = s.start(child, Wait::steps(5)).unwrap();

        assert_eq!(s.stop_all(parent), 1);
        assert_eq!(a.state(), TaskState::Stopped);
        assert_eq!(b.state(), TaskState::Running);
    }

    #[test]
    fn start_on_dead_container_is_rejected() {
        let s = Scheduler::default();
        let c = s.create_container("c", None).unwrap();
        s.destroy_now(c).unwrap();
        assert_eq!(
            s.start(c, Wait::immediate()).unwrap_err(),
            HostError::ContainerGone { container: c }
        );
    }

    #[test]
    fn destroy_is_deferred_to_end_of_frame() {
        let s = Scheduler::default();
        let c = s.create_container("c", None).unwrap();
        let h = s.start(c, Wait::steps(10)).unwrap();
        let torn = Rc::new(Cell::new(0));
        let t = Rc::clone(&torn);
        s.on_teardown(c, move || t.set(t.get() + 1)).unwrap();

        s.destroy(c, 0).unwrap();
        s.destroy(c, 3).unwrap();
        assert!(s.is_alive(c));
        assert!(!s.is_idle());

        let report = s.tick().unwrap();
        assert_eq!(report.destroyed, 1);
        assert!(!s.is_alive(c));
        assert_eq!(h.state(), TaskState::Stopped);
        assert_eq!(torn.get(), 1);

        ticks(&s, 4);
        assert_eq!(torn.get(), 1);
        assert!(s.is_idle());
    }

    #[test]
    fn destroy_with_delay_waits_frames() {
        let s = Scheduler::default();
        let c = s.create_container("c", None).unwrap();
        ticks(&s, 1);
        s.destroy(c, 2).unwrap();
        ticks(&s, 1);
        assert!(s.is_alive(c));
        ticks(&s, 1);
        assert!(!s.is_alive(c));
    }

    #[test]
    fn huge_destroy_delay_saturates() {
        let s = Scheduler::default();
        let c = s.create_container("c", None).unwrap();
        ticks(&s, 1);
        s.destroy(c, u64::MAX).unwrap();
        ticks(&s, 3);
        assert!(s.is_alive(c));

        // An earlier deadline still wins.
        s.destroy(c, 0).unwrap();
        ticks(&s, 1);
        assert!(!s.is_alive(c));
    }

    #[test]
    fn destroy_now_tears_down_children_first() {
        let s = Scheduler::default();
        let parent = s.create_container("parent", None).unwrap();
        let child = s.create_container("child", Some(parent)).unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        for c in [parent, child] {
            let o = Rc::clone(&order);
            s.on_teardown(c, move || o.borrow_mut().push(c)).unwrap();
        }

        assert_eq!(s.destroy_now(parent).unwrap(), 2);
        assert_eq!(*order.borrow(), vec![child, parent]);
        assert!(s.destroy_now(parent).is_err());
        assert_eq!(s.destroy(s.root(), 0), Err(HostError::RootContainer));
    }

    #[test]
    fn hook_scheduling_another_destroy_is_flushed_same_frame() {
        let s = Scheduler::default();
        let a = s.create_container("a", None).unwrap();
        let b = s.create_container("b", None).unwrap();
        let weak = s.downgrade();
        s.on_teardown(a, move || {
            if let Some(s) = weak.upgrade() {
                s.destroy(b, 0).unwrap();
            }
        })
        .unwrap();

        s.destroy(a, 0).unwrap();
        let report = s.tick().unwrap();
        assert_eq!(report.destroyed, 2);
        assert!(!s.is_alive(b));
    }

    #[test]
    fn reentrant_tick_is_rejected() {
        let s = Scheduler::default();
        let seen = Rc::new(RefCell::new(None));
        let out = Rc::clone(&seen);
        s.start(
            s.root(),
            RoutineFn::new(move |frame| {
                if frame.number() > 0 {
                    *out.borrow_mut() = Some(frame.scheduler().tick());
                    return Step::Done;
                }
                Step::Yield
            }),
        )
        .unwrap();

        s.tick().unwrap();
        assert_eq!(seen.borrow().clone(), Some(Err(HostError::ReentrantTick)));
        // The guard released the flag.
        assert!(s.tick().is_ok());
    }

    #[test]
    fn future_routine_yields_per_frame() {
        let s = Scheduler::default();
        let h = s
            .start(
                s.root(),
                FutureRoutine::new(async {
                    next_frame().await;
                    next_frame().await;
                }),
            )
            .unwrap();
        ticks(&s, 1);
        assert!(!h.is_finished());
        ticks(&s, 1);
        assert!(h.is_finished());
    }

    #[test]
    fn weak_reference_does_not_keep_scheduler_alive() {
        let s = Scheduler::default();
        let weak = s.downgrade();
        assert!(weak.upgrade().is_some());
        drop(s);
        assert!(weak.upgrade().is_none());
    }
}
