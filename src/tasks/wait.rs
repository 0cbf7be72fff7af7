//! Small building-block routines.

use super::routine::{Frame, Routine, Step};

/// Finishes on its k-th step.
///
/// `Wait::steps(0)` behaves like `Wait::steps(1)`: every routine takes at
/// least one step.
#[derive(Debug, Clone)]
pub struct Wait {
    left: u32,
}

impl Wait {
    /// A routine that needs exactly `k` steps.
    pub fn steps(k: u32) -> Self {
        Self { left: k.max(1) }
    }

    /// A routine that finishes on its first step.
    pub fn immediate() -> Self {
        Self::steps(1)
    }

    /// Steps still needed, including the next one.
    pub fn remaining(&self) -> u32 {
        self.left
    }
}

impl Routine for Wait {
    fn step(&mut self, _frame: &mut Frame<'_>) -> Step {
        self.left = self.left.saturating_sub(1);
        if self.left == 0 {
            Step::Done
        } else {
            Step::Yield
        }
    }
}

/// Closure-backed routine.
///
/// ```
/// use tickvisor::{RoutineFn, Step};
///
/// let mut ticks = 0;
/// let _r = RoutineFn::new(move |_frame| {
///     ticks += 1;
///     if ticks == 3 { Step::Done } else { Step::Yield }
/// });
/// ```
pub struct RoutineFn<F> {
    f: F,
}

impl<F> RoutineFn<F>
where
    F: FnMut(&mut Frame<'_>) -> Step + 'static,
{
    /// Wraps `f`; it is called once per step.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Routine for RoutineFn<F>
where
    F: FnMut(&mut Frame<'_>) -> Step + 'static,
{
    fn step(&mut self, frame: &mut Frame<'_>) -> Step {
        (self.f)(frame)
    }
}
