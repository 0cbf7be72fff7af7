//! # Suspendable routines.
//!
//! A [`Routine`] is a resumable state machine advanced one [`Step`] per frame by
//! the [`Scheduler`]. Each call to [`Routine::step`] either finishes the routine
//! ([`Step::Done`]) or hands control back until the next frame ([`Step::Yield`]).
//!
//! A routine that "needs k steps" returns `Done` from its k-th call. The first
//! call happens synchronously inside [`Scheduler::start`]; every later call
//! happens inside [`Scheduler::tick`].
//!
//! ```text
//! start() ──► step #1 ──Yield──► tick ──► step #2 ──Yield──► tick ──► step #k ──Done──► finished
//! ```

use crate::core::{ContainerId, Scheduler, TaskId};

/// Outcome of one step.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Suspend until the next frame.
    Yield,
    /// The routine has finished; it will not be stepped again.
    Done,
}

impl Step {
    /// `true` for [`Step::Done`].
    #[inline]
    pub fn is_done(self) -> bool {
        matches!(self, Step::Done)
    }
}

/// Per-step view of the host handed to [`Routine::step`].
pub struct Frame<'a> {
    scheduler: &'a Scheduler,
    container: ContainerId,
    task: TaskId,
    number: u64,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        scheduler: &'a Scheduler,
        container: ContainerId,
        task: TaskId,
        number: u64,
    ) -> Self {
        Self {
            scheduler,
            container,
            task,
            number,
        }
    }

    /// The scheduler stepping this routine.
    pub fn scheduler(&self) -> &'a Scheduler {
        self.scheduler
    }

    /// The container owning this routine.
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Id of the task being stepped.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Current frame number (`0` before the first tick).
    pub fn number(&self) -> u64 {
        self.number
    }
}

/// # Resumable unit of work.
///
/// Routines are single-threaded: they live on the scheduler thread and may hold
/// `Rc`/`RefCell` state.
///
/// # Example
/// ```
/// use tickvisor::{Frame, Routine, Step};
///
/// struct Countdown(u32);
///
/// impl Routine for Countdown {
///     fn step(&mut self, _frame: &mut Frame<'_>) -> Step {
///         self.0 = self.0.saturating_sub(1);
///         if self.0 == 0 { Step::Done } else { Step::Yield }
///     }
/// }
/// ```
pub trait Routine: 'static {
    /// Advances the routine by one step.
    fn step(&mut self, frame: &mut Frame<'_>) -> Step;
}

/// Owned, type-erased routine.
pub type BoxRoutine = Box<dyn Routine>;

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn step(&mut self, frame: &mut Frame<'_>) -> Step {
        (**self).step(frame)
    }
}

/// Combinators available on every routine.
pub trait RoutineExt: Routine + Sized {
    /// Runs `on_done` once, right after the routine finishes.
    ///
    /// `on_done` never runs if the routine is stopped before finishing.
    fn then<F>(self, on_done: F) -> Then<Self, F>
    where
        F: FnOnce() + 'static,
    {
        Then {
            inner: self,
            on_done: Some(on_done),
        }
    }

    /// Boxes the routine.
    fn boxed(self) -> BoxRoutine {
        Box::new(self)
    }
}

impl<R: Routine> RoutineExt for R {}

/// Routine returned by [`RoutineExt::then`].
pub struct Then<R, F> {
    inner: R,
    on_done: Option<F>,
}

impl<R, F> Routine for Then<R, F>
where
    R: Routine,
    F: FnOnce() + 'static,
{
    fn step(&mut self, frame: &mut Frame<'_>) -> Step {
        let step = self.inner.step(frame);
        if step.is_done() {
            if let Some(on_done) = self.on_done.take() {
                on_done();
            }
        }
        step
    }
}
