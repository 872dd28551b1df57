//! In-memory map surface.
//!
//! `HeadlessMap` keeps sources, layers, paint overrides, and the camera in
//! plain collections and answers rendered-feature queries with geometric
//! hit-testing. It stands in for a renderer in the command-line viewer and
//! in integration suites, and follows renderer semantics where the
//! coordinator can observe them: a style swap drops every source and layer,
//! layers are queried topmost first, and a torn-down surface rejects writes.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use geo::{Coord, Intersects, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{
    Camera, ClickPoint, Cursor, LayerSpec, MapSurface, MapSurfaceError,
};
use crate::domain::{Feature, FeatureCollection, Geometry, LngLat, Position, ViewportBounds};

/// Default hit radius for point features, in degrees (roughly 10 m).
pub const DEFAULT_POINT_TOLERANCE: f64 = 0.0001;

/// Camera change requested by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMove {
    /// Animated move to a centre and zoom.
    FlyTo {
        /// Target centre.
        center: LngLat,
        /// Target zoom.
        zoom: f64,
    },
    /// Fit to a rectangle with padding.
    FitBounds {
        /// Target rectangle.
        bounds: ViewportBounds,
        /// Padding in pixels.
        padding: u32,
    },
}

#[derive(Debug)]
struct HeadlessState {
    camera: Camera,
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<LayerSpec>,
    cursor: Cursor,
    style_url: Option<String>,
    style_changes: usize,
    moves: Vec<CameraMove>,
    torn_down: bool,
}

/// Renderer-free [`MapSurface`].
#[derive(Debug)]
pub struct HeadlessMap {
    state: Mutex<HeadlessState>,
    point_tolerance: f64,
}

impl HeadlessMap {
    /// Empty surface looking at `camera`.
    pub const fn new(camera: Camera) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                camera,
                sources: BTreeMap::new(),
                layers: Vec::new(),
                cursor: Cursor::Default,
                style_url: None,
                style_changes: 0,
                moves: Vec::new(),
                torn_down: false,
            }),
            point_tolerance: DEFAULT_POINT_TOLERANCE,
        }
    }

    /// Override the point hit radius, in degrees.
    pub fn with_point_tolerance(mut self, tolerance: f64) -> Self {
        self.point_tolerance = tolerance;
        self
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writable(&self) -> Result<MutexGuard<'_, HeadlessState>, MapSurfaceError> {
        let state = self.state();
        if state.torn_down {
            Err(MapSurfaceError::torn_down())
        } else {
            Ok(state)
        }
    }

    /// Move the camera as a user pan or zoom would.
    pub fn set_camera(&self, camera: Camera) {
        self.state().camera = camera;
    }

    /// Drag the view so it centres on `center`, keeping zoom and span.
    pub fn pan_to(&self, center: LngLat) {
        let mut state = self.state();
        state.camera = Camera {
            center,
            zoom: state.camera.zoom,
            bounds: rescaled(state.camera.bounds, center, 1.0),
        };
    }

    /// Current data of source `id`.
    pub fn source_data(&self, id: &str) -> Option<FeatureCollection> {
        self.state().sources.get(id).cloned()
    }

    /// Layer identifiers in draw order, bottom first.
    pub fn layer_ids(&self) -> Vec<&'static str> {
        self.state().layers.iter().map(|layer| layer.id).collect()
    }

    /// Current value of one paint property.
    pub fn paint_property(&self, layer: &str, property: &str) -> Option<Value> {
        self.state()
            .layers
            .iter()
            .find(|spec| spec.id == layer)
            .and_then(|spec| spec.paint.get(property).cloned())
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.state().cursor
    }

    /// Last style URL requested.
    pub fn style_url(&self) -> Option<String> {
        self.state().style_url.clone()
    }

    /// Number of style swaps so far.
    pub fn style_changes(&self) -> usize {
        self.state().style_changes
    }

    /// Camera moves requested so far, oldest first.
    pub fn camera_moves(&self) -> Vec<CameraMove> {
        self.state().moves.clone()
    }

    /// Whether [`MapSurface::teardown`] has run.
    pub fn is_torn_down(&self) -> bool {
        self.state().torn_down
    }

    fn hits(&self, geometry: &Geometry, at: LngLat) -> bool {
        let point = Point::new(at.lng, at.lat);
        match geometry {
            Geometry::Point([lng, lat]) => {
                (lng - at.lng).hypot(lat - at.lat) <= self.point_tolerance
            }
            Geometry::Polygon(rings) => {
                to_polygon(rings).is_some_and(|polygon| polygon.intersects(&point))
            }
            Geometry::MultiPolygon(polygons) => {
                MultiPolygon::new(polygons.iter().filter_map(|rings| to_polygon(rings)).collect())
                    .intersects(&point)
            }
        }
    }
}

fn to_ring(ring: &[Position]) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|[x, y]| Coord { x: *x, y: *y })
            .collect::<Vec<_>>(),
    )
}

fn to_polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        to_ring(exterior),
        interiors.iter().map(|ring| to_ring(ring)).collect(),
    ))
}

fn rescaled(bounds: ViewportBounds, center: LngLat, factor: f64) -> ViewportBounds {
    let half_lng = (bounds.max_lng - bounds.min_lng) * factor / 2.0;
    let half_lat = (bounds.max_lat - bounds.min_lat) * factor / 2.0;
    ViewportBounds::new(
        center.lng - half_lng,
        center.lat - half_lat,
        center.lng + half_lng,
        center.lat + half_lat,
    )
}

impl MapSurface for HeadlessMap {
    fn camera(&self) -> Camera {
        self.state().camera
    }

    fn has_source(&self, id: &str) -> bool {
        self.state().sources.contains_key(id)
    }

    fn add_source(&self, id: &str, data: &FeatureCollection) -> Result<(), MapSurfaceError> {
        let mut state = self.writable()?;
        if state.sources.contains_key(id) {
            return Err(MapSurfaceError::duplicate_source(id));
        }
        state.sources.insert(id.to_owned(), data.clone());
        Ok(())
    }

    fn set_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), MapSurfaceError> {
        let mut state = self.writable()?;
        let slot = state
            .sources
            .get_mut(id)
            .ok_or_else(|| MapSurfaceError::unknown_source(id))?;
        *slot = data.clone();
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state().layers.iter().any(|layer| layer.id == id)
    }

    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapSurfaceError> {
        let mut state = self.writable()?;
        if state.layers.iter().any(|existing| existing.id == layer.id) {
            return Err(MapSurfaceError::duplicate_layer(layer.id));
        }
        if !state.sources.contains_key(layer.source) {
            return Err(MapSurfaceError::unknown_source(layer.source));
        }
        state.layers.push(layer.clone());
        Ok(())
    }

    fn set_paint_property(
        &self,
        layer: &str,
        property: &str,
        value: Value,
    ) -> Result<(), MapSurfaceError> {
        let mut state = self.writable()?;
        let spec = state
            .layers
            .iter_mut()
            .find(|spec| spec.id == layer)
            .ok_or_else(|| MapSurfaceError::unknown_layer(layer))?;
        spec.paint.insert(property.to_owned(), value);
        Ok(())
    }

    fn set_cursor(&self, cursor: Cursor) {
        self.state().cursor = cursor;
    }

    fn query_rendered_features(
        &self,
        point: &ClickPoint,
        layers: &[&'static str],
    ) -> Vec<Feature> {
        let state = self.state();
        let mut hits = Vec::new();
        for layer in state.layers.iter().rev() {
            if !layers.contains(&layer.id) {
                continue;
            }
            let Some(source) = state.sources.get(layer.source) else {
                continue;
            };
            hits.extend(
                source
                    .features
                    .iter()
                    .filter(|feature| {
                        feature.geometry.as_ref().is_some_and(|geometry| {
                            layer.filter.admits(geometry.kind())
                                && self.hits(geometry, point.lng_lat)
                        })
                    })
                    .cloned(),
            );
        }
        debug!(
            lng = point.lng_lat.lng,
            lat = point.lng_lat.lat,
            hits = hits.len(),
            "headless feature query"
        );
        hits
    }

    fn set_style(&self, url: &str) {
        let mut state = self.state();
        state.sources.clear();
        state.layers.clear();
        state.style_url = Some(url.to_owned());
        state.style_changes += 1;
    }

    fn fly_to(&self, center: LngLat, zoom: f64) {
        let mut state = self.state();
        let factor = (state.camera.zoom - zoom).exp2();
        state.camera = Camera {
            center,
            zoom,
            bounds: rescaled(state.camera.bounds, center, factor),
        };
        state.moves.push(CameraMove::FlyTo { center, zoom });
    }

    fn fit_bounds(&self, bounds: ViewportBounds, padding: u32) {
        let mut state = self.state();
        let old_span = state.camera.bounds.max_lng - state.camera.bounds.min_lng;
        let new_span = bounds.max_lng - bounds.min_lng;
        let zoom = if old_span > 0.0 && new_span > 0.0 {
            state.camera.zoom + (old_span / new_span).log2()
        } else {
            state.camera.zoom
        };
        state.camera = Camera {
            center: LngLat::new(
                f64::midpoint(bounds.min_lng, bounds.max_lng),
                f64::midpoint(bounds.min_lat, bounds.max_lat),
            ),
            zoom,
            bounds,
        };
        state.moves.push(CameraMove::FitBounds { bounds, padding });
    }

    fn teardown(&self) {
        let mut state = self.state();
        state.torn_down = true;
        state.sources.clear();
        state.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    //! Hit-testing and renderer-like bookkeeping.

    use super::*;
    use crate::domain::ports::{GeometryFilter, LayerKind};
    use crate::domain::Properties;
    use rstest::{fixture, rstest};
    use serde_json::{Map, json};

    fn square(min: f64, max: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            [min, min],
            [max, min],
            [max, max],
            [min, max],
            [min, min],
        ]])
    }

    fn named(name: &str, geometry: Geometry) -> Feature {
        let mut properties = Properties::new();
        properties.insert("name".to_owned(), json!(name));
        Feature::new(None, geometry, properties)
    }

    fn fill(id: &'static str, source: &'static str, filter: GeometryFilter) -> LayerSpec {
        LayerSpec {
            id,
            kind: LayerKind::Fill,
            source,
            filter,
            paint: Map::new(),
            layout: Map::new(),
        }
    }

    #[fixture]
    fn map() -> HeadlessMap {
        let map = HeadlessMap::new(Camera {
            center: LngLat::new(0.5, 0.5),
            zoom: 14.0,
            bounds: ViewportBounds::new(0.0, 0.0, 1.0, 1.0),
        });
        let shapes = FeatureCollection::new(vec![
            named("big", square(0.0, 1.0)),
            named("small", square(0.4, 0.6)),
            named("dot", Geometry::Point([0.5, 0.5])),
        ]);
        map.add_source("shapes", &shapes).expect("source");
        map.add_layer(&fill("shapes-fill", "shapes", GeometryFilter::Polygonal))
            .expect("fill layer");
        map.add_layer(&fill("shapes-point", "shapes", GeometryFilter::Point))
            .expect("point layer");
        map
    }

    fn names(features: &[Feature]) -> Vec<&str> {
        features
            .iter()
            .filter_map(|feature| feature.property_str("name"))
            .collect()
    }

    #[rstest]
    fn queries_return_topmost_layer_first(map: HeadlessMap) {
        let hits = map.query_rendered_features(
            &ClickPoint::at(LngLat::new(0.5, 0.5)),
            &["shapes-fill", "shapes-point"],
        );
        assert_eq!(names(&hits), vec!["dot", "big", "small"]);
    }

    #[rstest]
    fn queries_respect_requested_layers_and_geometry(map: HeadlessMap) {
        let hits =
            map.query_rendered_features(&ClickPoint::at(LngLat::new(0.2, 0.2)), &["shapes-fill"]);
        assert_eq!(names(&hits), vec!["big"]);

        let outside =
            map.query_rendered_features(&ClickPoint::at(LngLat::new(2.0, 2.0)), &["shapes-fill"]);
        assert!(outside.is_empty());
    }

    #[rstest]
    fn style_swap_drops_sources_and_layers(map: HeadlessMap) {
        map.set_style("https://tiles.example/streets/style.json");
        assert!(!map.has_source("shapes"));
        assert!(map.layer_ids().is_empty());
        assert_eq!(map.style_changes(), 1);
    }

    #[rstest]
    fn rejects_duplicates_and_unknown_targets(map: HeadlessMap) {
        assert_eq!(
            map.add_source("shapes", &FeatureCollection::empty()),
            Err(MapSurfaceError::duplicate_source("shapes"))
        );
        assert_eq!(
            map.set_source_data("missing", &FeatureCollection::empty()),
            Err(MapSurfaceError::unknown_source("missing"))
        );
        assert_eq!(
            map.set_paint_property("missing", "fill-opacity", json!(0.5)),
            Err(MapSurfaceError::unknown_layer("missing"))
        );
    }

    #[rstest]
    fn teardown_rejects_writes(map: HeadlessMap) {
        map.teardown();
        assert!(map.is_torn_down());
        assert_eq!(
            map.add_source("other", &FeatureCollection::empty()),
            Err(MapSurfaceError::torn_down())
        );
    }

    #[rstest]
    fn camera_moves_are_recorded(map: HeadlessMap) {
        map.fit_bounds(ViewportBounds::new(0.25, 0.25, 0.75, 0.75), 40);
        let camera = map.camera();
        assert_eq!(camera.center, LngLat::new(0.5, 0.5));
        assert!((camera.zoom - 15.0).abs() < 1e-9);

        map.fly_to(LngLat::new(0.5, 0.5), 14.0);
        assert!((map.camera().bounds.max_lng - 1.0).abs() < 1e-9);
        assert_eq!(map.camera_moves().len(), 2);
    }

    #[rstest]
    fn pans_keep_zoom_and_span(map: HeadlessMap) {
        map.pan_to(LngLat::new(2.0, 3.0));
        let camera = map.camera();
        assert_eq!(camera.center, LngLat::new(2.0, 3.0));
        assert!((camera.zoom - 14.0).abs() < 1e-9);
        assert!((camera.bounds.min_lng - 1.5).abs() < 1e-9);
        assert!((camera.bounds.max_lat - 3.5).abs() < 1e-9);
        assert!(map.camera_moves().is_empty());
    }
}
