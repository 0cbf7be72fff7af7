//! # Lifecycle subscribers.
//!
//! This module provides the [`Subscribe`] trait, the per-kind [`SubscriberSet`]
//! and, behind the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   TrackedTask ── emit(Event) ──► SubscriberSet ──► list[kind] (snapshot)
//!                                                        │
//!                                                   ┌────┴────┬─────────┐
//!                                                   ▼         ▼         ▼
//!                                               LogWriter  closure   Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::{SubscriberSet, Subscription};
pub use subscribe::Subscribe;
