//! Suppresses reconciliation of generations that were already processed.
use std::collections::HashMap;

/// Remembers the last successfully reconciled `generation` per object uid.
///
/// The apiserver delivers `Modified` events for status updates and re-list
/// resyncs; a controller that writes status would loop on its own writes
/// without this gate, since only spec changes bump the generation.
pub struct ChangeTracker {
    last_processed: HashMap<String, i64>,
    discard_duplicates: bool,
}

impl ChangeTracker {
    /// A tracker which gates duplicate generations iff `discard_duplicates`.
    pub fn new(discard_duplicates: bool) -> Self {
        Self {
            last_processed: HashMap::new(),
            discard_duplicates,
        }
    }

    /// True when this generation of the object has already been reconciled.
    ///
    /// Always false when the gate is disabled or the object carries no
    /// generation.
    pub fn is_already_handled(&self, uid: &str, generation: Option<i64>) -> bool {
        if !self.discard_duplicates {
            return false;
        }
        match (generation, self.last_processed.get(uid)) {
            (Some(generation), Some(last)) => *last >= generation,
            _ => false,
        }
    }

    /// Record a successful reconciliation of `generation`.
    pub fn track_handled(&mut self, uid: &str, generation: Option<i64>) {
        if let Some(generation) = generation {
            self.last_processed.insert(uid.to_string(), generation);
        }
    }

    /// Forget an object after its deletion completed.
    pub fn track_deleted(&mut self, uid: &str) {
        self.last_processed.remove(uid);
    }

    /// True when a generation is recorded for `uid`.
    pub fn is_tracked(&self, uid: &str) -> bool {
        self.last_processed.contains_key(uid)
    }
}
