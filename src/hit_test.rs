use geo::Coord;
use log::debug;

use crate::features::{FeatureId, FeatureStore};

/// Longitudinal width of one world copy, in degrees.
pub const WORLD_WIDTH: f64 = 360.0;

/// Shifts a longitude by whole world widths into `[-180, 180)`.
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + WORLD_WIDTH / 2.0).rem_euclid(WORLD_WIDTH) - WORLD_WIDTH / 2.0
}

/// Features containing `coord` (`x` = longitude, `y` = latitude), topmost
/// first.
///
/// A pointer over a repeated world copy reports longitudes outside the
/// canonical range, so a second lookup runs at the wrapped coordinate and its
/// hits are appended after the primary ones.
pub fn features_at(store: &FeatureStore, coord: Coord<f64>) -> Vec<FeatureId> {
    let mut hits = hits_at(store, coord);

    let wrapped = Coord {
        x: wrap_longitude(coord.x),
        y: coord.y,
    };
    if wrapped != coord {
        for id in hits_at(store, wrapped) {
            if !hits.contains(&id) {
                hits.push(id);
            }
        }
    }

    debug!("Hit test at ({:.3}, {:.3}): {:?}", coord.x, coord.y, hits);
    hits
}

fn hits_at(store: &FeatureStore, coord: Coord<f64>) -> Vec<FeatureId> {
    store
        .iter()
        .rev()
        .filter(|feature| feature.contains(coord))
        .map(|feature| feature.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::fixtures::square;

    #[test]
    fn wraps_into_canonical_world() {
        assert_eq!(wrap_longitude(10.0), 10.0);
        assert_eq!(wrap_longitude(370.0), 10.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(-540.0), -180.0);
    }

    #[test]
    fn empty_ocean_has_no_hits() {
        let mut store = FeatureStore::new();
        store.push("Iceland", "Ice.", square(-24.0, 63.0, -13.0, 67.0));

        assert!(features_at(&store, Coord { x: -30.0, y: 40.0 }).is_empty());
    }

    #[test]
    fn overlapping_features_are_topmost_first() {
        let mut store = FeatureStore::new();
        let below = store.push("Morocco", "Mor.", square(-13.0, 27.0, -1.0, 36.0));
        let above = store.push("W. Sahara", "W. Sah.", square(-17.0, 20.0, -8.0, 28.0));

        let hits = features_at(&store, Coord { x: -10.0, y: 27.5 });
        assert_eq!(hits, vec![above, below]);
    }

    #[test]
    fn finds_features_in_adjacent_world_copy() {
        let mut store = FeatureStore::new();
        let japan = store.push("Japan", "Jpn.", square(129.0, 31.0, 146.0, 45.0));

        // One world to the east, and one to the west.
        assert_eq!(features_at(&store, Coord { x: 140.0 + WORLD_WIDTH, y: 36.0 }), vec![japan]);
        assert_eq!(features_at(&store, Coord { x: 140.0 - WORLD_WIDTH, y: 36.0 }), vec![japan]);
    }

    #[test]
    fn wrapped_hits_follow_primary_hits() {
        let mut store = FeatureStore::new();
        // Drawn past the antimeridian, so it matches the raw coordinate.
        let wide = store.push("Wide", "W.", square(170.0, 60.0, 200.0, 70.0));
        let west = store.push("West", "W.", square(-170.0, 60.0, -160.0, 70.0));

        let hits = features_at(&store, Coord { x: 195.0, y: 65.0 });
        assert_eq!(hits, vec![wide, west]);
    }

    #[test]
    fn latitude_is_not_wrapped() {
        let mut store = FeatureStore::new();
        store.push("Chile", "Chile", square(-75.0, -55.0, -67.0, -17.0));

        assert!(features_at(&store, Coord { x: -70.0, y: -30.0 + 360.0 }).is_empty());
    }
}
