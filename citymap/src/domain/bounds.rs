//! Longitude/latitude primitives and viewport rectangles.

use serde::{Deserialize, Serialize};

use super::geojson::Geometry;

const COORDINATE_SCALE: f64 = 1e6;

/// Round a coordinate to six decimal places.
///
/// Six decimals (roughly 0.1 m) keeps request parameters stable across tiny
/// camera jitters. Rounding an already rounded value returns it unchanged.
///
/// # Examples
/// ```
/// use citymap::domain::round_coordinate;
///
/// let once = round_coordinate(-73.567_312_49);
/// assert_eq!(once, -73.567_312);
/// assert_eq!(round_coordinate(once), once);
/// ```
pub fn round_coordinate(value: f64) -> f64 {
    (value * COORDINATE_SCALE).round() / COORDINATE_SCALE
}

/// A geographic coordinate in WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Build a coordinate.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Axis-aligned rectangle describing the visible map area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportBounds {
    /// Western edge.
    pub min_lng: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl ViewportBounds {
    /// Build bounds from `[min_lng, min_lat, max_lng, max_lat]` parts.
    pub const fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// Copy with every edge rounded to six decimal places.
    pub fn rounded(self) -> Self {
        Self::new(
            round_coordinate(self.min_lng),
            round_coordinate(self.min_lat),
            round_coordinate(self.max_lng),
            round_coordinate(self.max_lat),
        )
    }

    /// Bounds in `[min_lng, min_lat, max_lng, max_lat]` order.
    pub const fn as_array(&self) -> [f64; 4] {
        [self.min_lng, self.min_lat, self.max_lng, self.max_lat]
    }

    /// Whether `point` lies inside or on the edge of the rectangle.
    pub fn contains(&self, point: LngLat) -> bool {
        (self.min_lng..=self.max_lng).contains(&point.lng)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }

    /// Smallest rectangle enclosing every position of `geometry`.
    ///
    /// Returns `None` for geometries without coordinates.
    pub fn enclosing(geometry: &Geometry) -> Option<Self> {
        geometry
            .positions()
            .into_iter()
            .fold(None, |acc: Option<Self>, [lng, lat]| {
                Some(match acc {
                    None => Self::new(lng, lat, lng, lat),
                    Some(bounds) => Self::new(
                        bounds.min_lng.min(lng),
                        bounds.min_lat.min(lat),
                        bounds.max_lng.max(lng),
                        bounds.max_lat.max(lat),
                    ),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    //! Rounding and bounding-box extraction coverage.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-73.567_312_49, -73.567_312)]
    #[case(45.501_688_7, 45.501_689)]
    #[case(0.000_000_4, 0.0)]
    #[case(-73.98, -73.98)]
    fn rounds_to_six_decimals(#[case] raw: f64, #[case] expected: f64) {
        assert!(
            (round_coordinate(raw) - expected).abs() < 1e-12,
            "{raw} should round to {expected}"
        );
    }

    #[rstest]
    #[case(-73.567_312_49)]
    #[case(45.501_688_5)]
    #[case(179.999_999_95)]
    #[case(-0.000_000_5)]
    #[case(12.345_678_901_234)]
    fn rounding_is_idempotent(#[case] raw: f64) {
        let once = round_coordinate(raw);
        assert_eq!(round_coordinate(once), once);
    }

    #[test]
    fn rounded_bounds_round_every_edge() {
        let raw = ViewportBounds::new(-73.612_345_67, 45.481_234_56, -73.522_222_22, 45.529_999_99);
        let bounds = raw.rounded();
        assert_eq!(
            bounds.as_array(),
            [-73.612_346, 45.481_235, -73.522_222, 45.53]
        );
        assert_eq!(bounds.rounded(), bounds);
    }

    #[test]
    fn enclosing_covers_all_polygon_rings() {
        let geometry = Geometry::MultiPolygon(vec![
            vec![vec![[-73.60, 45.50], [-73.58, 45.52], [-73.60, 45.50]]],
            vec![vec![[-73.55, 45.48], [-73.54, 45.49], [-73.55, 45.48]]],
        ]);
        let bounds = ViewportBounds::enclosing(&geometry).expect("bounds");
        assert_eq!(bounds.as_array(), [-73.60, 45.48, -73.54, 45.52]);
        assert!(bounds.contains(LngLat::new(-73.57, 45.50)));
        assert!(!bounds.contains(LngLat::new(-73.50, 45.50)));
    }

    #[test]
    fn enclosing_empty_polygon_is_none() {
        assert!(ViewportBounds::enclosing(&Geometry::Polygon(Vec::new())).is_none());
    }
}
