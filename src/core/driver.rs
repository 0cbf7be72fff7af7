//! # Driver: runs a scheduler on a tokio frame clock.
//!
//! The [`Scheduler`] only advances when somebody calls [`Scheduler::tick`].
//! [`Driver`] is that somebody for applications that have no frame loop of
//! their own: it ticks once per [`Config::frame`](crate::Config::frame) on a
//! `tokio::time::interval`.
//!
//! ## Exit conditions
//! ```text
//! run_until_idle()      ──► no live task and no pending destruction
//! run(token)            ──► token cancelled
//! run_until_shutdown()  ──► SIGINT / SIGTERM / SIGQUIT (Ctrl-C on Windows)
//!
//! any of them           ──► frame budget exhausted with tasks still live
//!                           → RuntimeError::FrameBudgetExceeded { live }
//! ```
//!
//! ## Rules
//! - The driver future is `!Send` (the scheduler is single-threaded): await it
//!   directly, or spawn it on a `LocalSet`.
//! - `frame = 0s` free-runs: frames are separated by `tokio::task::yield_now`.
//! - The frame budget is the only timeout in the host.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Config, Driver, Scheduler, Wait};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sched = Scheduler::new(Config::default());
//!     sched.start(sched.root(), Wait::steps(3))?;
//!
//!     let report = Driver::new(sched).run_until_idle().await?;
//!     assert_eq!(report.frames, 2);
//!     Ok(())
//! }
//! ```

use std::io;
use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

use super::scheduler::Scheduler;
use super::shutdown;

/// Summary of one driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveReport {
    /// Frames advanced by this run.
    pub frames: u64,
    /// Whether the scheduler was idle when the run ended.
    pub idle: bool,
}

enum FrameClock {
    Interval(Interval),
    Free,
}

impl FrameClock {
    fn new(period: Option<Duration>) -> Self {
        match period {
            Some(p) => {
                let mut interval = time::interval(p);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                FrameClock::Interval(interval)
            }
            None => FrameClock::Free,
        }
    }

    async fn next(&mut self) {
        match self {
            FrameClock::Interval(i) => {
                i.tick().await;
            }
            FrameClock::Free => tokio::task::yield_now().await,
        }
    }
}

/// Frame loop around a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct Driver {
    scheduler: Scheduler,
}

impl Driver {
    /// Creates a driver; the frame period and budget come from the scheduler's config.
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// The driven scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Ticks until the scheduler is idle.
    pub async fn run_until_idle(&self) -> Result<DriveReport, RuntimeError> {
        self.drive(&CancellationToken::new(), true).await
    }

    /// Ticks until `token` is cancelled, whether or not tasks remain.
    pub async fn run(&self, token: CancellationToken) -> Result<DriveReport, RuntimeError> {
        self.drive(&token, false).await
    }

    /// Ticks until the process receives a termination signal.
    pub async fn run_until_shutdown(&self) -> Result<DriveReport, RuntimeError> {
        self.run_until_signal(shutdown::termination()).await
    }

    /// Ticks until `signal` resolves; no frame starts after that.
    async fn run_until_signal(
        &self,
        signal: impl Future<Output = io::Result<&'static str>>,
    ) -> Result<DriveReport, RuntimeError> {
        let token = CancellationToken::new();
        let drive = self.drive(&token, false);
        tokio::pin!(drive);

        tokio::select! {
            res = &mut drive => res,
            sig = signal => {
                let sig = sig?;
                tracing::info!(signal = sig, frame = self.scheduler.frame(), "shutdown requested");
                token.cancel();
                drive.await
            }
        }
    }

    async fn drive(
        &self,
        token: &CancellationToken,
        until_idle: bool,
    ) -> Result<DriveReport, RuntimeError> {
        let cfg = self.scheduler.config();
        let budget = cfg.frame_budget();
        let mut clock = FrameClock::new(cfg.frame_period());
        let mut frames: u64 = 0;

        loop {
            let idle = self.scheduler.is_idle();
            if until_idle && idle {
                return Ok(DriveReport { frames, idle });
            }
            if budget.is_some_and(|b| frames >= b) {
                if idle {
                    return Ok(DriveReport { frames, idle });
                }
                let live = self.scheduler.live_names();
                tracing::warn!(frames, live = live.len(), "frame budget exhausted");
                return Err(RuntimeError::FrameBudgetExceeded { frames, live });
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Ok(DriveReport { frames, idle: self.scheduler.is_idle() });
                }
                _ = clock.next() => {}
            }

            self.scheduler.tick()?;
            frames += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::Config;
    use crate::tasks::{RoutineFn, Step, Wait};

    fn sched(frame_ms: u64, max_frames: u64) -> Scheduler {
        Scheduler::new(Config {
            frame: Duration::from_millis(frame_ms),
            max_frames,
            ..Config::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_idle() {
        let s = sched(10, 0);
        let h = s.start(s.root(), Wait::steps(4)).unwrap();

        let report = Driver::new(s.clone()).run_until_idle().await.unwrap();
        assert!(h.is_finished());
        assert_eq!(report, DriveReport { frames: 3, idle: true });
    }

    #[tokio::test(start_paused = true)]
    async fn frames_follow_the_clock() {
        let s = sched(10, 0);
        s.start(s.root(), Wait::steps(6)).unwrap();

        let started = time::Instant::now();
        Driver::new(s).run_until_idle().await.unwrap();
        // First interval tick is immediate.
        assert_eq!(started.elapsed(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_reports_live_tasks() {
        let s = sched(10, 5);
        s.spawn(s.root(), &*crate::TaskFn::rc("forever", || RoutineFn::new(|_| Step::Yield)))
            .unwrap();

        let err = Driver::new(s).run_until_idle().await.unwrap_err();
        match err {
            RuntimeError::FrameBudgetExceeded { frames, live } => {
                assert_eq!(frames, 5);
                assert_eq!(live, vec!["forever".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_run() {
        let s = sched(10, 0);
        let steps = Rc::new(Cell::new(0u32));
        let token = CancellationToken::new();
        let (st, tk) = (Rc::clone(&steps), token.clone());
        s.start(
            s.root(),
            RoutineFn::new(move |_| {
                st.set(st.get() + 1);
                if st.get() == 4 {
                    tk.cancel();
                }
                Step::Yield
            }),
        )
        .unwrap();

        let report = Driver::new(s).run(token).await.unwrap();
        assert_eq!(report, DriveReport { frames: 3, idle: false });
    }

    #[tokio::test(start_paused = true)]
    async fn termination_signal_ends_the_run() {
        let s = sched(10, 0);
        s.start(s.root(), RoutineFn::new(|_| Step::Yield)).unwrap();

        let signal = async {
            time::sleep(Duration::from_millis(35)).await;
            Ok("SIGTERM")
        };
        let report = Driver::new(s).run_until_signal(signal).await.unwrap();
        assert_eq!(report, DriveReport { frames: 4, idle: false });
    }

    #[tokio::test(start_paused = true)]
    async fn signal_setup_failure_is_reported() {
        let s = sched(10, 0);
        s.start(s.root(), RoutineFn::new(|_| Step::Yield)).unwrap();

        let signal = async { Err(io::Error::other("no signal handlers")) };
        let err = Driver::new(s).run_until_signal(signal).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Signal(_)), "{err}");
        assert_eq!(err.as_label(), "runtime_signal");
    }

    #[tokio::test]
    async fn free_running_clock() {
        let s = sched(0, 0);
        s.start(s.root(), Wait::steps(3)).unwrap();
        let report = Driver::new(s).run_until_idle().await.unwrap();
        assert_eq!(report.frames, 2);
    }
}
