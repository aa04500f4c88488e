//! Identity-based diff between two marker collections.
//!
//! Only ids are compared. A marker whose id survives but whose fields changed
//! is not reported here; updates go through an explicit remove/add pair.

use crate::markers::marker::Marker;
use crate::prelude::HashSet;
use crate::render::command::RenderCommand;

/// Markers to add and remove to move from one collection to another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDiff {
    pub added: Vec<Marker>,
    pub removed: Vec<Marker>,
}

impl MarkerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Rendering commands for this diff: removals first, then additions
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.removed
            .iter()
            .map(|m| RenderCommand::remove_marker(&m.id))
            .chain(self.added.iter().cloned().map(RenderCommand::add_marker))
            .collect()
    }

    pub fn added_ids(&self) -> Vec<&str> {
        self.added.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn removed_ids(&self) -> Vec<&str> {
        self.removed.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Diffs `previous` against `next` by id in linear time.
///
/// `added` keeps the order of `next`, `removed` the order of `previous`.
/// An id repeated within one input is reported at most once.
pub fn reconcile(previous: &[Marker], next: &[Marker]) -> MarkerDiff {
    let previous_ids: HashSet<&str> = previous.iter().map(|m| m.id.as_str()).collect();
    let next_ids: HashSet<&str> = next.iter().map(|m| m.id.as_str()).collect();

    let mut seen = HashSet::default();
    let added = next
        .iter()
        .filter(|m| !previous_ids.contains(m.id.as_str()) && seen.insert(m.id.as_str()))
        .cloned()
        .collect();

    let mut seen = HashSet::default();
    let removed = previous
        .iter()
        .filter(|m| !next_ids.contains(m.id.as_str()) && seen.insert(m.id.as_str()))
        .cloned()
        .collect();

    MarkerDiff { added, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;

    fn markers(ids: &[&str]) -> Vec<Marker> {
        ids.iter()
            .map(|id| Marker::new(*id, LatLng::new(0.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_disjoint_sets() {
        let a = markers(&["1", "2"]);
        let b = markers(&["3", "4", "5"]);

        let forward = reconcile(&a, &b);
        assert_eq!(forward.added_ids(), vec!["3", "4", "5"]);
        assert_eq!(forward.removed_ids(), vec!["1", "2"]);

        let backward = reconcile(&b, &a);
        assert_eq!(backward.added_ids(), vec!["1", "2"]);
        assert_eq!(backward.removed_ids(), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_identical_sets_yield_nothing() {
        let a = markers(&["1", "2", "3"]);
        let diff = reconcile(&a, &a);
        assert!(diff.is_empty());
        assert!(diff.commands().is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(&[], &[]).is_empty());
        assert_eq!(reconcile(&[], &markers(&["a"])).added_ids(), vec!["a"]);
        assert_eq!(reconcile(&markers(&["a"]), &[]).removed_ids(), vec!["a"]);
    }

    #[test]
    fn test_field_changes_are_not_reported() {
        let before = vec![Marker::new("x", LatLng::new(0.0, 0.0)).with_status("Pendiente")];
        let after = vec![Marker::new("x", LatLng::new(1.0, 1.0)).with_status("Completo")];
        assert!(reconcile(&before, &after).is_empty());
    }

    #[test]
    fn test_overlapping_sets() {
        let diff = reconcile(&markers(&["a", "b"]), &markers(&["b", "c"]));
        assert_eq!(diff.added_ids(), vec!["c"]);
        assert_eq!(diff.removed_ids(), vec!["a"]);
        assert_eq!(
            diff.commands(),
            vec![
                RenderCommand::remove_marker("a"),
                RenderCommand::add_marker(Marker::new("c", LatLng::new(0.0, 0.0))),
            ]
        );
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let diff = reconcile(&markers(&["a", "a"]), &markers(&["b", "b"]));
        assert_eq!(diff.added_ids(), vec!["b"]);
        assert_eq!(diff.removed_ids(), vec!["a"]);
    }
}
