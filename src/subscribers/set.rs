//! # SubscriberSet: ordered synchronous fan-out per event kind
//!
//! [`SubscriberSet`] keeps one ordered list of subscribers per [`EventKind`] and
//! delivers each [`Event`] to the list matching its kind.
//!
//! ## What it guarantees
//! - Registration order is delivery order.
//! - `emit` works on a snapshot: subscribing or unsubscribing from inside a
//!   subscriber affects the **next** emission, never the current one.
//! - Panics inside subscribers are caught and logged (isolation); the remaining
//!   subscribers still run.
//!
//! ## Diagram
//! ```text
//!    emit(&Event{kind: Completed})
//!        │
//!        ├── Started   [s1, s4]
//!        ├── Stopped   [s2]
//!        ├── Completed [s1, s3] ──► s1.on_event() ──► s3.on_event()
//!        └── Destroyed []
//! ```

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Opaque token returned by [`SubscriberSet::subscribe`].
///
/// Pass it back to [`SubscriberSet::unsubscribe`] to remove the subscriber.
/// Dropping the token does not unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// The event kind this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Entry {
    id: u64,
    sub: Rc<dyn Subscribe>,
}

/// Per-kind ordered subscriber lists.
#[derive(Default)]
pub struct SubscriberSet {
    lists: RefCell<[Vec<Entry>; 4]>,
    next_id: Cell<u64>,
}

impl SubscriberSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sub` to the list for `kind`.
    pub fn subscribe(&self, kind: EventKind, sub: impl Subscribe) -> Subscription {
        self.subscribe_rc(kind, Rc::new(sub))
    }

    /// Appends an already shared subscriber to the list for `kind`.
    ///
    /// The same subscriber may be registered for several kinds (or several
    /// times for one kind; it is then invoked once per registration).
    pub fn subscribe_rc(&self, kind: EventKind, sub: Rc<dyn Subscribe>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.lists.borrow_mut()[kind.index()].push(Entry { id, sub });
        Subscription { kind, id }
    }

    /// Removes the subscriber behind `token`.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        let mut lists = self.lists.borrow_mut();
        let list = &mut lists[token.kind.index()];
        match list.iter().position(|e| e.id == token.id) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Delivers `event` to every subscriber registered for its kind.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Rc<dyn Subscribe>> = self.lists.borrow()[event.kind.index()]
            .iter()
            .map(|e| Rc::clone(&e.sub))
            .collect();

        for sub in snapshot {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| sub.on_event(event)));
            if delivered.is_err() {
                tracing::error!(
                    subscriber = sub.name(),
                    kind = event.kind.as_label(),
                    "subscriber panicked"
                );
            }
        }
    }

    /// Number of subscribers registered for `kind`.
    #[must_use]
    pub fn len(&self, kind: EventKind) -> usize {
        self.lists.borrow()[kind.index()].len()
    }

    /// True if no subscriber is registered for any kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.borrow().iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder() -> (Log, impl Fn(&'static str) -> Box<dyn Fn(&Event)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let make = move |tag: &'static str| {
            let l = Rc::clone(&l);
            Box::new(move |_: &Event| l.borrow_mut().push(tag)) as Box<dyn Fn(&Event)>
        };
        (log, make)
    }

    #[test]
    fn delivers_in_registration_order_per_kind() {
        let set = SubscriberSet::new();
        let (log, make) = recorder();
        set.subscribe(EventKind::Completed, make("a"));
        set.subscribe(EventKind::Stopped, make("x"));
        set.subscribe(EventKind::Completed, make("b"));

        set.emit(&Event::new(EventKind::Completed));
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_removes_once() {
        let set = SubscriberSet::new();
        let (log, make) = recorder();
        let token = set.subscribe(EventKind::Started, make("a"));

        assert!(set.unsubscribe(token));
        assert!(!set.unsubscribe(token));
        set.emit(&Event::new(EventKind::Started));
        assert!(log.borrow().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn subscriber_added_during_emit_waits_for_next_emit() {
        let set = Rc::new(SubscriberSet::new());
        let hits = Rc::new(Cell::new(0));

        let inner_set = Rc::clone(&set);
        let inner_hits = Rc::clone(&hits);
        set.subscribe(EventKind::Started, move |_: &Event| {
            let h = Rc::clone(&inner_hits);
            inner_set.subscribe(EventKind::Started, move |_: &Event| h.set(h.get() + 1));
        });

        set.emit(&Event::new(EventKind::Started));
        assert_eq!(hits.get(), 0);
        assert_eq!(set.len(EventKind::Started), 2);

        set.emit(&Event::new(EventKind::Started));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_starve_the_rest() {
        let set = SubscriberSet::new();
        let (log, make) = recorder();
        struct Boom;
        impl Subscribe for Boom {
            fn on_event(&self, _: &Event) {
                panic!("boom");
            }
        }

        set.subscribe(EventKind::Destroyed, Boom);
        set.subscribe(EventKind::Destroyed, make("after"));

        set.emit(&Event::new(EventKind::Destroyed));
        assert_eq!(*log.borrow(), vec!["after"]);
    }
}
