//! Host core: scheduler, containers and the frame driver.
//!
//! The public API from this module is [`Scheduler`] (with [`WeakScheduler`],
//! [`TaskHandle`] and [`ContainerId`]) and [`Driver`].
//!
//! Internal modules:
//! - [`scheduler`]: task slots, the frame step, container teardown;
//! - [`container`]: the container tree and teardown hooks;
//! - [`handle`]: task ids and observable task state;
//! - [`driver`]: tokio frame clock around a scheduler;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod container;
mod driver;
mod handle;
mod scheduler;
mod shutdown;

pub use container::ContainerId;
pub use driver::{DriveReport, Driver};
pub use handle::{TaskHandle, TaskId, TaskState};
pub use scheduler::{Scheduler, TickReport, WeakScheduler};
