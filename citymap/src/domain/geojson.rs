//! GeoJSON shapes exchanged with the remote data service and the map surface.
//!
//! Collections are values: a new response replaces the previous collection
//! wholesale, so nothing here supports incremental patching.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bounds::LngLat;

/// Free-form feature attributes as returned by the API.
pub type Properties = Map<String, Value>;

/// A `[lng, lat]` coordinate pair.
pub type Position = [f64; 2];

/// Application-defined feature identifier.
///
/// The service emits string identifiers, but numeric identifiers are kept
/// verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// String identifier.
    Text(String),
    /// Numeric identifier.
    Number(i64),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Geometry kinds produced by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// Outer ring followed by holes.
    Polygon(Vec<Vec<Position>>),
    /// A set of polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Discriminant of [`Geometry`], used by layer filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// [`Geometry::Point`].
    Point,
    /// [`Geometry::Polygon`].
    Polygon,
    /// [`Geometry::MultiPolygon`].
    MultiPolygon,
}

impl Geometry {
    /// Return the geometry discriminant.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Whether the geometry is a polygon or multipolygon.
    pub fn is_polygonal(&self) -> bool {
        matches!(self, Self::Polygon(_) | Self::MultiPolygon(_))
    }

    /// The coordinate of a point geometry.
    pub fn as_point(&self) -> Option<LngLat> {
        match self {
            Self::Point([lng, lat]) => Some(LngLat::new(*lng, *lat)),
            _ => None,
        }
    }

    /// Every position of the geometry, rings flattened in document order.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Self::Point(position) => vec![*position],
            Self::Polygon(rings) => rings.iter().flatten().copied().collect(),
            Self::MultiPolygon(polygons) => polygons.iter().flatten().flatten().copied().collect(),
        }
    }
}

/// One map feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Application-defined identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
    /// Geometry; the service may emit `null` for unlocated records.
    pub geometry: Option<Geometry>,
    /// Feature attributes.
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    /// Build a feature from its parts.
    pub fn new(id: Option<FeatureId>, geometry: Geometry, properties: Properties) -> Self {
        Self {
            id,
            geometry: Some(geometry),
            properties,
        }
    }

    /// Borrow a string property.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Ordered features; the unit of exchange with the map and the network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Features in response order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// An empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap the given features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// A collection holding one property-less copy of `geometry`.
    ///
    /// Used for the selection highlight overlay, which must never carry the
    /// selected feature's attributes.
    pub fn highlight(geometry: &Geometry) -> Self {
        Self::new(vec![Feature {
            id: None,
            geometry: Some(geometry.clone()),
            properties: Properties::new(),
        }])
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keep the features matching `predicate`, preserving order.
    pub fn filtered(&self, predicate: impl Fn(&Feature) -> bool) -> Self {
        Self::new(
            self.features
                .iter()
                .filter(|feature| predicate(feature))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    //! Decoding coverage for service payloads.

    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_polygon_feature_with_string_id() {
        let raw = json!({
            "type": "Feature",
            "id": "b-42",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-73.56, 45.50], [-73.55, 45.50], [-73.55, 45.51], [-73.56, 45.50]]]
            },
            "properties": { "address": "123 Rue Sainte-Catherine" }
        });

        let feature: Feature = serde_json::from_value(raw).expect("feature should decode");
        assert_eq!(feature.id, Some(FeatureId::from("b-42")));
        assert_eq!(
            feature.geometry.as_ref().map(Geometry::kind),
            Some(GeometryKind::Polygon)
        );
        assert_eq!(
            feature.property_str("address"),
            Some("123 Rue Sainte-Catherine")
        );
    }

    #[test]
    fn keeps_numeric_identifiers() {
        let raw = json!({
            "type": "Feature",
            "id": 7,
            "geometry": { "type": "Point", "coordinates": [-73.5, 45.5] },
            "properties": {}
        });

        let feature: Feature = serde_json::from_value(raw).expect("feature should decode");
        assert_eq!(feature.id, Some(FeatureId::Number(7)));
        assert_eq!(feature.id.map(|id| id.to_string()).as_deref(), Some("7"));
    }

    #[test]
    fn collection_serialises_with_geojson_type_tags() {
        let collection = FeatureCollection::highlight(&Geometry::Point([-73.5, 45.5]));
        let value = serde_json::to_value(&collection).expect("collection should encode");

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");
        assert_eq!(value["features"][0]["properties"], json!({}));
        assert!(value["features"][0].get("id").is_none());
    }

    #[test]
    fn missing_features_decode_as_empty() {
        let collection: FeatureCollection =
            serde_json::from_value(json!({ "type": "FeatureCollection" }))
                .expect("collection should decode");
        assert!(collection.is_empty());
    }

    #[test]
    fn multipolygon_positions_are_flattened_in_order() {
        let geometry = Geometry::MultiPolygon(vec![
            vec![vec![[0.0, 0.0], [1.0, 0.0]]],
            vec![vec![[2.0, 2.0]]],
        ]);
        assert_eq!(geometry.positions(), vec![[0.0, 0.0], [1.0, 0.0], [2.0, 2.0]]);
        assert!(geometry.is_polygonal());
        assert!(geometry.as_point().is_none());
    }
}
