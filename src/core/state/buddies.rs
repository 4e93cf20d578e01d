// src/core/state/buddies.rs

use indexmap::IndexSet;

/// Buddies this gateway currently considers connected. Packets from anyone
/// outside this set are never relayed.
#[derive(Debug, Default)]
pub struct KnownBuddies {
    ids: IndexSet<String>,
}

impl KnownBuddies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the buddy was already known.
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.shift_remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
