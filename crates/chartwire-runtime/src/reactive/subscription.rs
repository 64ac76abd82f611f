#![forbid(unsafe_code)]

//! Weak listener lists and their RAII subscription guards.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Keeps one listener registered for as long as it is alive.
///
/// Drop it (or call [`Subscription::cancel`]) to unsubscribe.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    _listener: Box<dyn Any>,
}

impl Subscription {
    /// Unsubscribe now. Equivalent to dropping the guard.
    pub fn cancel(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Ordered list of weakly held listeners of type `F`.
///
/// `F` is usually an unsized closure type such as `dyn Fn(&Scope)`.
pub struct Listeners<F: ?Sized> {
    entries: RefCell<Vec<Weak<F>>>,
}

impl<F: ?Sized + 'static> Listeners<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register `listener`; it stays registered while the returned guard lives.
    pub fn register(&self, listener: Rc<F>) -> Subscription {
        self.entries.borrow_mut().push(Rc::downgrade(&listener));
        Subscription {
            _listener: Box::new(listener),
        }
    }

    /// Strong references to every live listener, in registration order.
    ///
    /// Dead entries are dropped from the list as a side effect.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        let mut entries = self.entries.borrow_mut();
        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        live
    }

    /// Number of live listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: ?Sized + 'static> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for Listeners<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("entries", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Callback = dyn Fn(u32);

    fn notify(listeners: &Listeners<Callback>, value: u32) {
        for listener in listeners.snapshot() {
            listener(value);
        }
    }

    #[test]
    fn notifies_in_registration_order() {
        let listeners = Listeners::<Callback>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let log = Rc::clone(&log);
                listeners.register(Rc::new(move |v| log.borrow_mut().push((i, v))))
            })
            .collect();

        notify(&listeners, 7);
        assert_eq!(*log.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let listeners = Listeners::<Callback>::new();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let sub = listeners.register(Rc::new(move |v| s.set(v)));
        assert_eq!(listeners.len(), 1);

        drop(sub);
        notify(&listeners, 9);
        assert_eq!(seen.get(), 0, "callback must not fire after drop");
        assert!(listeners.is_empty());
    }

    #[test]
    fn cancel_is_drop() {
        let listeners = Listeners::<Callback>::new();
        let sub = listeners.register(Rc::new(|_| {}));
        sub.cancel();
        assert_eq!(listeners.snapshot().len(), 0);
    }

    #[test]
    fn listener_may_release_itself_mid_notification() {
        let listeners = Listeners::<Callback>::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let own = Rc::clone(&slot);
        let c = Rc::clone(&calls);
        let sub = listeners.register(Rc::new(move |_| {
            c.set(c.get() + 1);
            own.borrow_mut().take();
        }));
        *slot.borrow_mut() = Some(sub);

        notify(&listeners, 1);
        notify(&listeners, 2);
        assert_eq!(calls.get(), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn listener_registered_mid_notification_waits_for_next_cycle() {
        let listeners = Rc::new(Listeners::<Callback>::new());
        let late_calls = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&listeners);
        let h = Rc::clone(&held);
        let late = Rc::clone(&late_calls);
        let _first = listeners.register(Rc::new(move |_| {
            if h.borrow().is_empty() {
                let late = Rc::clone(&late);
                let sub = l.register(Rc::new(move |_| late.set(late.get() + 1)));
                h.borrow_mut().push(sub);
            }
        }));

        notify(&listeners, 1);
        assert_eq!(late_calls.get(), 0);
        notify(&listeners, 2);
        assert_eq!(late_calls.get(), 1);
    }
}
