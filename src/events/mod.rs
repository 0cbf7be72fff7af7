//! Lifecycle events: types only.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: [`TrackedTask`](crate::TrackedTask) (run, stop, completion, container teardown).
//! - **Consumers**: anything registered through a [`SubscriberSet`](crate::SubscriberSet).

mod event;

pub use event::{Event, EventKind};
