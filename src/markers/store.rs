use crate::markers::{marker::Marker, reconcile::MarkerDiff};
use crate::prelude::HashMap;

/// Authoritative collection of currently known markers, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    /// All markers indexed by ID
    markers: HashMap<String, Marker>,
    /// Ids in insertion order; this is the store's natural iteration order
    order: Vec<String>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a collection, keeping the first marker of each id
    pub fn from_markers(markers: impl IntoIterator<Item = Marker>) -> Self {
        let mut store = Self::new();
        for marker in markers {
            store.insert(marker);
        }
        store
    }

    /// Inserts a marker whose id is not yet known. Returns `false` and leaves
    /// the store untouched if the id is already present.
    pub fn insert(&mut self, marker: Marker) -> bool {
        if self.markers.contains_key(&marker.id) {
            return false;
        }
        self.order.push(marker.id.clone());
        self.markers.insert(marker.id.clone(), marker);
        true
    }

    /// Replaces the marker with the same id in place, inserting it if unknown.
    /// Returns the previous value.
    pub fn replace(&mut self, marker: Marker) -> Option<Marker> {
        match self.markers.get_mut(&marker.id) {
            Some(existing) => Some(std::mem::replace(existing, marker)),
            None => {
                self.insert(marker);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Marker> {
        let removed = self.markers.remove(id)?;
        self.order.retain(|known| known != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    /// Iterates markers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    /// Owned copy of the current contents in iteration order
    pub fn snapshot(&self) -> Vec<Marker> {
        self.iter().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Advances the store by a reconciliation result.
    ///
    /// Removals run first so a diff never leaves two entries for one id.
    pub fn apply(&mut self, diff: &MarkerDiff) {
        if diff.removed.is_empty() && diff.added.is_empty() {
            return;
        }
        let removed: crate::prelude::HashSet<&str> =
            diff.removed.iter().map(|m| m.id.as_str()).collect();
        for id in &removed {
            self.markers.remove(*id);
        }
        self.order.retain(|id| !removed.contains(id.as_str()));

        for marker in &diff.added {
            self.insert(marker.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
