//! Types for the watch api
//!
//! See <https://kubernetes.io/docs/reference/using-api/api-concepts/#efficient-detection-of-changes>
use serde::{Deserialize, Serialize};
use std::fmt;

/// The discriminant of a raw watch event.
///
/// `Deleted` is the terminal notification emitted after an object is gone;
/// controllers that own finalizers drive deletion from `Modified` events
/// carrying a `deletionTimestamp` instead. `Bookmark` is a resume token with
/// no object payload of interest.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// Resource was added
    Added,
    /// Resource was modified
    Modified,
    /// Resource was deleted
    Deleted,
    /// Watch progress marker
    Bookmark,
    /// The server reported an error inline on the stream
    Error,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Added => "Added",
            EventType::Modified => "Modified",
            EventType::Deleted => "Deleted",
            EventType::Bookmark => "Bookmark",
            EventType::Error => "Error",
        };
        f.write_str(name)
    }
}
