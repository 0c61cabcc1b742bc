use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// Callback for scroll/resize notifications; receives the event timestamp.
pub type Listener = Box<dyn FnMut(Instant)>;

/// Scroll container the gallery is mounted in.
///
/// The gallery only reads these values; the host owns scrolling and sizing.
pub trait ViewportObserver {
    fn on_scroll(&self, listener: Listener) -> Subscription;

    fn on_resize(&self, listener: Listener) -> Subscription;

    fn current_offset(&self) -> f64;

    fn viewport_extent(&self) -> f64;

    fn container_width(&self) -> f64;
}

/// Unregisters its listener when dropped or cancelled.
#[must_use = "dropping a subscription unregisters the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    emitting: bool,
    cancelled: Vec<u64>,
}

/// Listener registry for [`ViewportObserver`] implementations.
///
/// Listeners may subscribe or unsubscribe from inside a notification.
#[derive(Clone, Default)]
pub struct ListenerSet {
    registry: Rc<RefCell<Registry>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&self, listener: Listener) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, listener));
            id
        };
        let weak = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            let Some(registry) = weak.upgrade() else {
                return;
            };
            let mut registry = registry.borrow_mut();
            registry.listeners.retain(|(other, _)| *other != id);
            if registry.emitting {
                registry.cancelled.push(id);
            }
        })
    }

    pub fn emit(&self, now: Instant) {
        let mut running = {
            let mut registry = self.registry.borrow_mut();
            registry.emitting = true;
            std::mem::take(&mut registry.listeners)
        };
        for (_, listener) in running.iter_mut() {
            listener(now);
        }
        let mut registry = self.registry.borrow_mut();
        registry.emitting = false;
        let cancelled = std::mem::take(&mut registry.cancelled);
        running.retain(|(id, _)| !cancelled.contains(id));
        running.append(&mut registry.listeners);
        registry.listeners = running;
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropping_a_subscription_stops_notifications() {
        let set = ListenerSet::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sub = set.add(Box::new(move |_| h.set(h.get() + 1)));

        set.emit(Instant::now());
        drop(sub);
        set.emit(Instant::now());
        assert_eq!(hits.get(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn listener_can_unsubscribe_itself_during_emit() {
        let set = ListenerSet::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));

        let (s, h) = (slot.clone(), hits.clone());
        let sub = set.add(Box::new(move |_| {
            h.set(h.get() + 1);
            s.borrow_mut().take();
        }));
        *slot.borrow_mut() = Some(sub);

        set.emit(Instant::now());
        set.emit(Instant::now());
        assert_eq!(hits.get(), 1);
        assert!(set.is_empty());
    }
}
