//! Change notification with explicit subscription handles.
//!
//! Listeners are plain closures run on the notifying thread. A
//! [`Subscription`] is returned for each registration; unsubscribing (or
//! dropping the handle) removes the listener exactly once.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

impl Listeners {
    fn get(&self, id: u64) -> Option<Listener> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, listener)| listener.clone())
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }
}

/// Fan-out of "changed" events to registered listeners.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listeners: Rc<RefCell<Listeners>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`; it stays registered while the returned handle lives.
    pub fn subscribe(&self, listener: Box<dyn Fn()>) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::from(listener)));
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            id,
            active: true,
        }
    }

    /// Call every listener registered at the time of the call.
    ///
    /// Listeners may subscribe or unsubscribe while being notified; one
    /// removed by an earlier listener in the same round is not called.
    pub fn notify(&self) {
        let ids: Vec<u64> = self.listeners.borrow().entries.iter().map(|(id, _)| *id).collect();
        for id in ids {
            let listener = self.listeners.borrow().get(id);
            if let Some(listener) = listener {
                listener();
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Unregister the listener.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Whether the listener is still registered with a live notifier.
    pub fn is_active(&self) -> bool {
        self.active && self.listeners.strong_count() > 0
    }

    fn detach(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Box<dyn Fn()>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Box::new(move || c.set(c.get() + 1)))
    }

    #[test]
    fn test_notify_calls_listeners() {
        let notifier = ChangeNotifier::new();
        let (count, listener) = counter();
        let _sub = notifier.subscribe(listener);

        notifier.notify();
        notifier.notify();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let notifier = ChangeNotifier::new();
        let (count, listener) = counter();
        let sub = notifier.subscribe(listener);
        assert!(sub.is_active());

        sub.unsubscribe();
        notifier.notify();
        assert_eq!(count.get(), 0);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let notifier = ChangeNotifier::new();
        let (count, listener) = counter();
        drop(notifier.subscribe(listener));
        notifier.notify();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let notifier = ChangeNotifier::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0));

        let s = slot.clone();
        let c = count.clone();
        let sub = notifier.subscribe(Box::new(move || {
            c.set(c.get() + 1);
            if let Some(sub) = s.borrow_mut().take() {
                sub.unsubscribe();
            }
        }));
        *slot.borrow_mut() = Some(sub);

        notifier.notify();
        notifier.notify();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_subscription_outlives_notifier() {
        let notifier = ChangeNotifier::new();
        let (_count, listener) = counter();
        let sub = notifier.subscribe(listener);
        drop(notifier);
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
