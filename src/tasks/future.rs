//! # Future-backed routines.
//!
//! [`FutureRoutine`] lets a routine be written as an `async` block. Each step
//! polls the future once with a no-op waker: the scheduler polls every live
//! task every frame, so wake-ups carry no information.
//!
//! Suspension points are written with [`next_frame`]:
//!
//! ```rust
//! use tickvisor::{FutureRoutine, next_frame};
//!
//! let _fade = FutureRoutine::new(async {
//!     for _ in 0..30 {
//!         // advance the fade...
//!         next_frame().await;
//!     }
//! });
//! ```
//!
//! Awaiting something that is not driven by the frame clock (a tokio timer,
//! a channel) works but is only re-checked once per frame.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use super::routine::{Frame, Routine, Step};

/// Adapts a `Future<Output = ()>` into a [`Routine`].
pub struct FutureRoutine {
    fut: Pin<Box<dyn Future<Output = ()>>>,
}

impl FutureRoutine {
    /// Wraps `fut`. The future is first polled on the routine's first step.
    pub fn new(fut: impl Future<Output = ()> + 'static) -> Self {
        Self { fut: Box::pin(fut) }
    }
}

impl Routine for FutureRoutine {
    fn step(&mut self, _frame: &mut Frame<'_>) -> Step {
        let mut cx = Context::from_waker(noop_waker_ref());
        match self.fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => Step::Done,
            Poll::Pending => Step::Yield,
        }
    }
}

/// A future that is pending exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            // Keeps the future usable on wake-driven executors too.
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Suspends the current [`FutureRoutine`] until the next frame.
pub async fn next_frame() {
    YieldOnce(false).await
}
