//! Identifier-keyed entity storage.
//!
//! Each subsystem owns one [`Registry`] per entity kind. Lookup is O(1) by
//! identifier; anything that must be reproducible (update passes, snapshots,
//! state hashing) walks the entries in sorted identifier order.

use std::collections::HashMap;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

/// Entities that carry a stable string identifier.
pub trait Identified {
    /// Identifier, unique within the owning registry.
    fn id(&self) -> &str;
}

/// Storage for one kind of entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get sorted IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate entities in sorted ID order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &T> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, value)| value)
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Iterate mutably over all entities (not in deterministic order).
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }
}

impl<T: Identified> Registry<T> {
    /// Insert an entity under its own identifier, replacing any previous entry.
    pub fn insert(&mut self, entity: T) -> Option<T> {
        self.entries.insert(entity.id().to_string(), entity)
    }
}

impl<T: Clone> Registry<T> {
    /// Owned copies of every entity, in sorted ID order.
    #[must_use]
    pub fn sorted_values(&self) -> Vec<T> {
        self.iter_sorted().cloned().collect()
    }
}

impl<T: Serialize> Registry<T> {
    /// Feed every entity into `hasher` in sorted ID order.
    ///
    /// Entities are hashed through their JSON encoding so floating-point
    /// fields contribute their exact value.
    pub fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        hasher.write_usize(self.entries.len());
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (id, entity) in entries {
            hasher.write(id.as_bytes());
            if let Ok(bytes) = serde_json::to_vec(entity) {
                hasher.write(&bytes);
            }
        }
    }
}
