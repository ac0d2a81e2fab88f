//! Coalesces watch events per object and serializes their handling.
use operon_core::{EventType, Resource, ResourceExt};
use std::collections::{HashMap, HashSet};

/// A watch event bound to a decoded object.
#[derive(Clone)]
pub struct Event<K> {
    /// What happened to the object
    pub event_type: EventType,
    /// The decoded object payload
    pub object: K,
}

impl<K: Resource> Event<K> {
    /// Construct an event around an object.
    pub fn new(event_type: EventType, object: K) -> Self {
        Self { event_type, object }
    }

    /// The queueing identity of this event.
    pub fn uid(&self) -> Option<String> {
        self.object.uid()
    }
}

/// A single-slot queue per object uid with a disjoint currently-handling set.
///
/// At most one event is pending per uid; a newer observation overwrites an
/// older one, because reconciliation is a level-triggered function of the
/// latest state. While a uid is marked handling, [`EventQueue::take`]
/// refuses to hand out its pending slot, which gives the engine its
/// one-reconcile-in-flight-per-object invariant.
///
/// The struct is not internally synchronized; the owning controller guards
/// it together with the change tracker under one lock.
pub struct EventQueue<K> {
    pending: HashMap<String, Event<K>>,
    handling: HashSet<String>,
}

impl<K> Default for EventQueue<K> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            handling: HashSet::new(),
        }
    }
}

impl<K> EventQueue<K> {
    /// Park `event` as the pending slot for `uid`, displacing any older one.
    pub fn insert(&mut self, uid: &str, event: Event<K>) {
        self.pending.insert(uid.to_string(), event);
    }

    /// The pending event for `uid`, if any, without removing it.
    pub fn peek(&self, uid: &str) -> Option<&Event<K>> {
        self.pending.get(uid)
    }

    /// Remove and return the pending event for `uid`.
    ///
    /// Returns `None` while a reconciliation for `uid` is in flight, so a
    /// second one can never start.
    pub fn take(&mut self, uid: &str) -> Option<Event<K>> {
        if self.handling.contains(uid) {
            return None;
        }
        self.pending.remove(uid)
    }

    /// Mark `uid` as having a reconciliation in flight.
    pub fn begin_handling(&mut self, uid: &str) {
        self.handling.insert(uid.to_string());
    }

    /// Clear the in-flight marker for `uid`.
    pub fn end_handling(&mut self, uid: &str) {
        self.handling.remove(uid);
    }

    /// True while a reconciliation for `uid` is in flight.
    pub fn is_handling(&self, uid: &str) -> bool {
        self.handling.contains(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventQueue};
    use operon_core::EventType;

    fn ev(marker: u32) -> Event<u32> {
        Event {
            event_type: EventType::Modified,
            object: marker,
        }
    }

    #[test]
    fn newest_pending_event_wins() {
        let mut q = EventQueue::default();
        q.insert("u1", ev(1));
        q.insert("u1", ev(2));
        q.insert("u1", ev(3));
        assert_eq!(q.take("u1").map(|e| e.object), Some(3));
        assert!(q.take("u1").is_none());
    }

    #[test]
    fn take_is_blocked_while_handling() {
        let mut q = EventQueue::default();
        q.insert("u1", ev(1));
        let first = q.take("u1").unwrap();
        q.begin_handling("u1");
        // a newer event arrives mid-reconcile
        q.insert("u1", ev(2));
        assert!(q.take("u1").is_none());
        assert_eq!(q.peek("u1").map(|e| e.object), Some(2));
        q.end_handling("u1");
        assert_eq!(q.take("u1").map(|e| e.object), Some(2));
        assert_eq!(first.object, 1);
    }

    #[test]
    fn uids_are_independent() {
        let mut q = EventQueue::default();
        q.insert("u1", ev(1));
        q.insert("u2", ev(2));
        q.begin_handling("u1");
        assert!(q.take("u1").is_none());
        assert_eq!(q.take("u2").map(|e| e.object), Some(2));
    }
}
