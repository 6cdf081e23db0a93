use anyhow::Context;
use geo::{BoundingRect, Contains, Coord, Geometry, MultiPolygon, Point, Rect};
use geojson::{FeatureCollection, GeoJson};
use log::{debug, info};
use std::path::Path;

pub type FeatureId = usize;

/// Names longer than this are labelled with their abbreviation.
pub const MAX_LABEL_CHARS: usize = 12;

const NAME_KEYS: [&str; 4] = ["ADMIN", "admin", "NAME", "name"];
const ABBREV_KEYS: [&str; 2] = ["ABBREV", "abbrev"];

#[derive(Debug, Clone)]
pub struct CountryFeature {
    id: FeatureId,
    display_name: String,
    abbreviation: String,
    geometry: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
    is_active: bool,
    is_selected: bool,
}

impl CountryFeature {
    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    /// The name shown in the header and handed to the resolver.
    pub fn label(&self) -> &str {
        let abbreviation = self.abbreviation();
        if self.display_name.chars().count() > MAX_LABEL_CHARS && !abbreviation.is_empty() {
            abbreviation
        } else {
            self.display_name()
        }
    }

    /// `(lon, lat)` containment, with a bounding box check first.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        match self.bounds {
            Some(b) if coord.x < b.min().x || coord.x > b.max().x => false,
            Some(b) if coord.y < b.min().y || coord.y > b.max().y => false,
            Some(_) => self.geometry.contains(&Point::from(coord)),
            None => false,
        }
    }
}

/// Country boundaries loaded once at startup. Ids are dataset positions, so
/// later features draw on top of earlier ones.
#[derive(Debug, Default)]
pub struct FeatureStore {
    features: Vec<CountryFeature>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read boundary dataset {}", path.display()))?;
        let store = Self::from_geojson_str(&text)
            .with_context(|| format!("failed to parse boundary dataset {}", path.display()))?;
        info!("Loaded {} country features from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn from_geojson_str(text: &str) -> anyhow::Result<Self> {
        let geojson: GeoJson = text.parse()?;
        let collection = FeatureCollection::try_from(geojson)?;
        let mut store = Self::new();

        for feature in collection.features {
            let name = first_string_property(&feature, &NAME_KEYS).unwrap_or_default();
            let abbreviation = first_string_property(&feature, &ABBREV_KEYS).unwrap_or_default();

            let Some(geometry) = feature.geometry else {
                debug!("Skipping feature {:?} without geometry", name);
                continue;
            };
            let geometry: Geometry<f64> = geometry
                .value
                .try_into()
                .with_context(|| format!("invalid geometry for {:?}", name))?;
            let polygons = match geometry {
                Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                Geometry::MultiPolygon(m) => m,
                _ => {
                    debug!("Skipping non-areal feature {:?}", name);
                    continue;
                }
            };

            store.push(name, abbreviation, polygons);
        }

        Ok(store)
    }

    pub fn push(
        &mut self,
        display_name: impl Into<String>,
        abbreviation: impl Into<String>,
        geometry: MultiPolygon<f64>,
    ) -> FeatureId {
        let id = self.features.len();
        let bounds = geometry.bounding_rect();
        self.features.push(CountryFeature {
            id,
            display_name: display_name.into(),
            abbreviation: abbreviation.into(),
            geometry,
            bounds,
            is_active: false,
            is_selected: false,
        });
        id
    }

    pub fn get(&self, id: FeatureId) -> Option<&CountryFeature> {
        self.features.get(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CountryFeature> {
        self.features.iter()
    }

    pub fn set_active(&mut self, id: FeatureId, active: bool) {
        if let Some(feature) = self.features.get_mut(id) {
            feature.is_active = active;
        }
    }

    pub fn set_selected(&mut self, id: FeatureId, selected: bool) {
        if let Some(feature) = self.features.get_mut(id) {
            feature.is_selected = selected;
        }
    }
}

fn first_string_property(feature: &geojson::Feature, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| feature.property(key))
        .find_map(|value| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use geo::{polygon, MultiPolygon};

    /// Axis-aligned box in `(lon, lat)` degrees.
    pub fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min_lon, y: min_lat),
            (x: max_lon, y: min_lat),
            (x: max_lon, y: max_lat),
            (x: min_lon, y: max_lat),
            (x: min_lon, y: min_lat),
        ]])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::square;
    use super::*;
    use serde_json::json;

    fn dataset() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "ADMIN": "United States of America", "ABBREV": "U.S.A." },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-125.0, 25.0], [-67.0, 25.0], [-67.0, 49.0], [-125.0, 49.0], [-125.0, 25.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "admin": "Fiji", "abbrev": "Fiji" },
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[177.0, -19.0], [180.0, -19.0], [180.0, -16.0], [177.0, -16.0], [177.0, -19.0]]],
                            [[[-180.0, -17.0], [-179.0, -17.0], [-179.0, -16.0], [-180.0, -16.0], [-180.0, -17.0]]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "ADMIN": "Null Island Marker" },
                    "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
                },
                {
                    "type": "Feature",
                    "properties": { "ADMIN": "Nowhere" },
                    "geometry": null
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn loads_areal_features_with_names() {
        let store = FeatureStore::from_geojson_str(&dataset()).unwrap();
        assert_eq!(store.len(), 2);

        let usa = store.get(0).unwrap();
        assert_eq!(usa.display_name(), "United States of America");
        assert_eq!(usa.abbreviation(), "U.S.A.");
        assert!(!usa.is_active());
        assert!(!usa.is_selected());

        let fiji = store.get(1).unwrap();
        assert_eq!(fiji.display_name(), "Fiji");
        assert_eq!(fiji.geometry().0.len(), 2);
    }

    #[test]
    fn rejects_non_collections() {
        let point = json!({ "type": "Point", "coordinates": [1.0, 2.0] }).to_string();
        assert!(FeatureStore::from_geojson_str(&point).is_err());
        assert!(FeatureStore::from_geojson_str("not json").is_err());
    }

    #[test]
    fn long_names_fall_back_to_abbreviation() {
        let mut store = FeatureStore::new();
        let long = store.push("United States of America", "U.S.A.", square(0.0, 0.0, 1.0, 1.0));
        let short = store.push("France", "Fr.", square(2.0, 0.0, 3.0, 1.0));
        let exactly_twelve = store.push("Saudi Arabia", "Saud.", square(4.0, 0.0, 5.0, 1.0));
        let no_abbrev = store.push("Bosnia and Herzegovina", "", square(6.0, 0.0, 7.0, 1.0));

        assert_eq!(store.get(long).unwrap().label(), "U.S.A.");
        assert_eq!(store.get(short).unwrap().label(), "France");
        assert_eq!(store.get(exactly_twelve).unwrap().label(), "Saudi Arabia");
        assert_eq!(store.get(no_abbrev).unwrap().label(), "Bosnia and Herzegovina");
    }

    #[test]
    fn containment_uses_lon_lat() {
        let store = FeatureStore::from_geojson_str(&dataset()).unwrap();
        let usa = store.get(0).unwrap();

        assert!(usa.contains(Coord { x: -100.0, y: 40.0 }));
        assert!(!usa.contains(Coord { x: 40.0, y: -100.0 }));
        assert!(!usa.contains(Coord { x: 2.35, y: 48.85 }));
    }

    #[test]
    fn flags_are_mutated_in_place() {
        let mut store = FeatureStore::new();
        let id = store.push("Chile", "Chile", square(-75.0, -55.0, -67.0, -17.0));

        store.set_active(id, true);
        assert!(store.get(id).unwrap().is_active());
        store.set_selected(id, true);
        store.set_active(id, false);
        assert!(store.get(id).unwrap().is_selected());
        assert!(!store.get(id).unwrap().is_active());

        // Unknown ids are ignored.
        store.set_active(99, true);
    }
}
