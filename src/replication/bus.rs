//! Typed listener registry
//!
//! Listeners are keyed by [`EventKind`] and removed with the
//! [`Registration`] handle returned when they were added.

use rustc_hash::FxHashMap;

use super::event::{EventKind, ReplicationEvent};

type Listener = Box<dyn FnMut(&ReplicationEvent) + Send + Sync>;

/// Handle for removing a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    kind: EventKind,
    id: u64,
}

impl Registration {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Listeners per event kind, called in registration order
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: FxHashMap<EventKind, Vec<(u64, Listener)>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&ReplicationEvent) + Send + Sync + 'static,
    ) -> Registration {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        Registration { kind, id }
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unregister(&mut self, registration: Registration) -> bool {
        let Some(listeners) = self.listeners.get_mut(&registration.kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != registration.id);
        before != listeners.len()
    }

    /// Call every listener for the event's kind; returns how many ran
    pub fn emit(&mut self, event: &ReplicationEvent) -> usize {
        self.listeners
            .get_mut(&event.kind())
            .map_or(0, |listeners| {
                for (_, listener) in listeners.iter_mut() {
                    listener(event);
                }
                listeners.len()
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emit_reaches_matching_kind_in_order() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.register(EventKind::KeyPressed, move |event| {
                seen.lock().unwrap().push(format!("{tag}:{event:?}"));
            });
        }
        let other = seen.clone();
        bus.register(EventKind::Close, move |_| other.lock().unwrap().push("close".into()));

        assert_eq!(bus.emit(&ReplicationEvent::KeyPressed('a')), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:KeyPressed('a')", "second:KeyPressed('a')"]
        );
        assert_eq!(bus.emit(&ReplicationEvent::Request), 0);
    }

    #[test]
    fn unregister_removes_only_that_listener() {
        let mut bus = EventBus::new();
        let a = bus.register(EventKind::Request, |_| {});
        let b = bus.register(EventKind::Request, |_| {});
        assert_eq!(bus.len(), 2);

        assert!(bus.unregister(a));
        assert!(!bus.unregister(a));
        assert_eq!(bus.len(), 1);
        assert_eq!(b.kind(), EventKind::Request);

        bus.clear();
        assert!(bus.is_empty());
        assert!(!bus.unregister(b));
    }
}
