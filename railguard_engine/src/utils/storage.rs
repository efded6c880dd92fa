use std::collections::BTreeMap;

/// Identifier issued by a [`Storage`]
pub type Id = u64;

/// Identifier that never refers to a live entry
pub const NULL_ID: Id = 0;

/// Identity-keyed container issuing monotonically increasing ids.
///
/// Ids start at 1 and are never reused, even after removal. Iteration yields
/// the surviving entries in insertion order (ids only grow, so key order is
/// insertion order). Looking up [`NULL_ID`] or a removed id is a miss.
///
/// References returned by [`get`](Storage::get) and `get_mut` borrow the
/// storage, so the borrow checker already forbids keeping them across a
/// `push` or `remove`. Keep ids, not references, across mutations.
///
/// # Example
///
/// ```ignore
/// let mut storage = Storage::new();
/// let a = storage.push("a");   // 1
/// let b = storage.push("b");   // 2
/// storage.remove(a);
/// let c = storage.push("c");   // 3, never 1 again
/// assert!(storage.get(a).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Storage<T> {
    entries: BTreeMap<Id, T>,
    last_id: Id,
}

impl<T> Storage<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            last_id: NULL_ID,
        }
    }

    /// Store a value and return its fresh id
    pub fn push(&mut self, value: T) -> Id {
        self.last_id += 1;
        self.entries.insert(self.last_id, value);
        self.last_id
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        if id == NULL_ID {
            return None;
        }
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut T> {
        if id == NULL_ID {
            return None;
        }
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.get(id).is_some()
    }

    /// Remove an entry, returning it. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: Id) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Remove every entry. Ids issued before stay retired.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Id, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id, &mut T)> {
        self.entries.iter_mut().map(|(id, value)| (*id, value))
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    /// Remove and return every entry, in insertion order
    pub fn drain(&mut self) -> Vec<(Id, T)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
