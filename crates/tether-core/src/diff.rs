//! Collection diff utility
//!
//! Computes which entities a whole-collection replacement adds and removes.
//! Both sets keep the order in which their members appear in the source
//! collection, so events raised from them are deterministic.

use std::collections::HashSet;

use tether_core_types::EntityId;

/// Added/removed sets between an old and a new collection value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionDiff {
    /// Members of the new collection that are not in the old one, in new-collection order
    pub added: Vec<EntityId>,
    /// Members of the old collection that are not in the new one, in old-collection order
    pub removed: Vec<EntityId>,
}

impl CollectionDiff {
    /// Compute `added = new - old` and `removed = old - new`
    pub fn compute(old: &[EntityId], new: &[EntityId]) -> Self {
        let old_set: HashSet<&EntityId> = old.iter().collect();
        let new_set: HashSet<&EntityId> = new.iter().collect();

        Self {
            added: distinct(new.iter().filter(|id| !old_set.contains(id))),
            removed: distinct(old.iter().filter(|id| !new_set.contains(id))),
        }
    }

    /// Whether the replacement changes membership at all
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Members present in both collections, in old-collection order
    pub fn unchanged(&self, old: &[EntityId]) -> Vec<EntityId> {
        let removed: HashSet<&EntityId> = self.removed.iter().collect();
        distinct(old.iter().filter(|id| !removed.contains(id)))
    }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a EntityId>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}
