//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging lifecycle listeners into a
//! [`TrackedTask`](crate::TrackedTask). Subscribers are invoked **synchronously**
//! on the scheduler thread, in registration order, at the moment of the transition.
//!
//! ## Contract
//! - Implementations should be quick: the transition (and the frame) waits for them.
//! - A subscriber may call back into the tracked task (`stop`, `run`, `subscribe`);
//!   the set it was invoked from has already been snapshotted.
//!
//! Any `Fn(&Event)` closure is a subscriber.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, Subscribe};
//!
//! struct Audit;
//!
//! impl Subscribe for Audit {
//!     fn on_event(&self, ev: &Event) {
//!         let _ = ev.kind;
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use crate::events::Event;

/// Contract for lifecycle subscribers.
pub trait Subscribe: 'static {
    /// Handle a single event for this subscriber.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Subscribe for F
where
    F: Fn(&Event) + 'static,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}
