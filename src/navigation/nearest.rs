use crate::{
    core::geo::{distance_km, LatLng},
    markers::{marker::Marker, store::MarkerStore},
    MapError, Result,
};

/// Marker closest to `position` together with its distance in kilometers.
///
/// Ties go to the marker that comes first in the store's iteration order.
pub fn nearest_with_distance<'a>(
    position: Option<LatLng>,
    store: &'a MarkerStore,
) -> Result<(&'a Marker, f64)> {
    let position = position.ok_or_else(|| {
        MapError::PositionUnavailable("current position is unknown".into())
    })?;

    let mut best: Option<(&Marker, f64)> = None;
    for marker in store.iter() {
        let distance = distance_km(&position, &marker.position);
        let is_better = match best {
            Some((_, best_distance)) => distance < best_distance,
            None => true,
        };
        if is_better {
            best = Some((marker, distance));
        }
    }

    best.ok_or(MapError::EmptyStore)
}

/// Marker closest to `position`
pub fn nearest_marker(position: Option<LatLng>, store: &MarkerStore) -> Result<&Marker> {
    nearest_with_distance(position, store).map(|(marker, _)| marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_example() {
        let store = MarkerStore::from_markers(vec![
            Marker::new("1", LatLng::new(-12.05, -77.04)),
            Marker::new("2", LatLng::new(-12.10, -77.10)),
        ]);
        let nearest = nearest_marker(Some(LatLng::new(-12.046, -77.042)), &store).unwrap();
        assert_eq!(nearest.id, "1");
    }

    #[test]
    fn test_tie_goes_to_first() {
        let store = MarkerStore::from_markers(vec![
            Marker::new("north", LatLng::new(1.0, 0.0)),
            Marker::new("south", LatLng::new(-1.0, 0.0)),
        ]);
        let (nearest, km) = nearest_with_distance(Some(LatLng::new(0.0, 0.0)), &store).unwrap();
        assert_eq!(nearest.id, "north");
        assert!((km - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_errors() {
        let empty = MarkerStore::new();
        assert!(matches!(
            nearest_marker(Some(LatLng::new(0.0, 0.0)), &empty),
            Err(MapError::EmptyStore)
        ));

        let store = MarkerStore::from_markers(vec![Marker::new("1", LatLng::new(0.0, 0.0))]);
        assert!(matches!(
            nearest_marker(None, &store),
            Err(MapError::PositionUnavailable(_))
        ));
    }
}
