//! # Global host configuration.
//!
//! Provides [`Config`] centralized settings for the scheduler, the frame
//! driver and tracked-task defaults.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::new(config)` (the driver reads it back from the scheduler)
//! 2. **TrackedTask defaults**: `TrackedTask::create(...)` copies the destroy flags
//!
//! ## Sentinel values
//! - `frame = 0s` → free-running driver (yields to tokio between frames instead of sleeping)
//! - `max_frames = 0` → no frame budget

use std::time::Duration;

/// Global configuration for the host.
///
/// ## Field semantics
/// - `frame`: Wall-clock period of one frame when driven by [`Driver`](crate::Driver) (`0s` = free-running)
/// - `max_frames`: Frame budget for a single driver run (`0` = unlimited)
/// - `destroy_on_complete`: Default for tracked tasks built by [`TrackedTask::create`](crate::TrackedTask::create)
/// - `destroy_on_stop`: Default for tracked tasks built by [`TrackedTask::create`](crate::TrackedTask::create)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Wall-clock period of one frame.
    ///
    /// - `Duration::ZERO` = free-running
    /// - `> 0` = the driver ticks on a `tokio::time::interval` of this period
    pub frame: Duration,

    /// Maximum number of frames one driver run may advance.
    ///
    /// When exhausted with tasks still live, the driver returns
    /// `RuntimeError::FrameBudgetExceeded`. There is no other timeout anywhere
    /// in the host.
    pub max_frames: u64,

    /// Whether fire-and-forget tracked tasks destroy their container on completion.
    pub destroy_on_complete: bool,

    /// Whether fire-and-forget tracked tasks destroy their container on stop.
    pub destroy_on_stop: bool,
}

impl Config {
    /// Returns the frame period as an `Option`.
    ///
    /// - `None` → free-running
    /// - `Some(d)` → one frame every `d`
    #[inline]
    pub fn frame_period(&self) -> Option<Duration> {
        if self.frame == Duration::ZERO {
            None
        } else {
            Some(self.frame)
        }
    }

    /// Returns the frame budget as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` frames per driver run
    #[inline]
    pub fn frame_budget(&self) -> Option<u64> {
        if self.max_frames == 0 {
            None
        } else {
            Some(self.max_frames)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `frame = 16ms` (roughly 60 frames per second)
    /// - `max_frames = 0` (unlimited)
    /// - `destroy_on_complete = true` (fire-and-forget convenience)
    /// - `destroy_on_stop = false`
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(16),
            max_frames: 0,
            destroy_on_complete: true,
            destroy_on_stop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinels_map_to_none() {
        let cfg = Config {
            frame: Duration::ZERO,
            max_frames: 0,
            ..Config::default()
        };
        assert_eq!(cfg.frame_period(), None);
        assert_eq!(cfg.frame_budget(), None);
    }

    #[test]
    fn defaults_favor_fire_and_forget() {
        let cfg = Config::default();
        assert!(cfg.destroy_on_complete);
        assert!(!cfg.destroy_on_stop);
        assert_eq!(cfg.frame_period(), Some(Duration::from_millis(16)));
    }
}
