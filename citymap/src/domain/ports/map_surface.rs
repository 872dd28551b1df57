//! Driven port for the map rendering surface.
//!
//! The surface owns the canvas, the camera, and the style; the domain only
//! publishes sources and layers into it and asks it what was hit. Calls are
//! synchronous because a real renderer applies them on its own thread.

use serde_json::{Map, Value};

use super::define_port_error;
use crate::domain::{Feature, FeatureCollection, GeometryKind, LngLat, ViewportBounds};

define_port_error! {
    /// Errors surfaced by the map surface.
    pub enum MapSurfaceError {
        /// No source with this identifier exists in the current style.
        UnknownSource { id: String } => "unknown map source: {id}",
        /// A source with this identifier already exists.
        DuplicateSource { id: String } => "map source already exists: {id}",
        /// No layer with this identifier exists in the current style.
        UnknownLayer { id: String } => "unknown map layer: {id}",
        /// A layer with this identifier already exists.
        DuplicateLayer { id: String } => "map layer already exists: {id}",
        /// The surface has been torn down.
        TornDown => "map surface has been torn down",
    }
}

/// Current camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Map centre.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
    /// Visible rectangle, unrounded.
    pub bounds: ViewportBounds,
}

/// A pointer position on the canvas and the coordinate beneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    /// Canvas x in pixels.
    pub x: f64,
    /// Canvas y in pixels.
    pub y: f64,
    /// Geographic coordinate under the pointer.
    pub lng_lat: LngLat,
}

impl ClickPoint {
    /// A point known only by its coordinate.
    pub const fn at(lng_lat: LngLat) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            lng_lat,
        }
    }
}

/// Pointer cursor shown over the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Renderer default.
    #[default]
    Default,
    /// Hand pointer over an interactive feature.
    Pointer,
}

/// Rendering primitive of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Stroked outlines.
    Line,
    /// Point circles.
    Circle,
    /// Text labels.
    Symbol,
}

impl LayerKind {
    /// Renderer type name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Line => "line",
            Self::Circle => "circle",
            Self::Symbol => "symbol",
        }
    }
}

/// Geometry filter applied by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFilter {
    /// Every feature of the source.
    Any,
    /// Polygons and multipolygons.
    Polygonal,
    /// Points only.
    Point,
}

impl GeometryFilter {
    /// Whether a geometry of `kind` passes the filter.
    pub const fn admits(self, kind: GeometryKind) -> bool {
        match self {
            Self::Any => true,
            Self::Polygonal => matches!(kind, GeometryKind::Polygon | GeometryKind::MultiPolygon),
            Self::Point => matches!(kind, GeometryKind::Point),
        }
    }

    /// Renderer filter expression; `None` for [`GeometryFilter::Any`].
    pub fn expression(self) -> Option<Value> {
        match self {
            Self::Any => None,
            Self::Polygonal => Some(serde_json::json!([
                "any",
                ["==", ["geometry-type"], "Polygon"],
                ["==", ["geometry-type"], "MultiPolygon"]
            ])),
            Self::Point => Some(serde_json::json!(["==", ["geometry-type"], "Point"])),
        }
    }
}

/// One layer definition.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Layer identifier.
    pub id: &'static str,
    /// Rendering primitive.
    pub kind: LayerKind,
    /// Source the layer draws from.
    pub source: &'static str,
    /// Geometry filter.
    pub filter: GeometryFilter,
    /// Paint properties.
    pub paint: Map<String, Value>,
    /// Layout properties.
    pub layout: Map<String, Value>,
}

/// Port for driving the map renderer.
#[cfg_attr(test, mockall::automock)]
pub trait MapSurface: Send + Sync {
    /// Current camera.
    fn camera(&self) -> Camera;

    /// Whether the current style holds source `id`.
    fn has_source(&self, id: &str) -> bool;

    /// Add a GeoJSON source.
    ///
    /// # Errors
    ///
    /// Returns [`MapSurfaceError::DuplicateSource`] when `id` already exists.
    fn add_source(&self, id: &str, data: &FeatureCollection) -> Result<(), MapSurfaceError>;

    /// Replace the whole data of source `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MapSurfaceError::UnknownSource`] when `id` does not exist.
    fn set_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), MapSurfaceError>;

    /// Whether the current style holds layer `id`.
    fn has_layer(&self, id: &str) -> bool;

    /// Add a layer on top of the existing ones.
    ///
    /// # Errors
    ///
    /// Fails on duplicate layers or unknown sources.
    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapSurfaceError>;

    /// Set one paint property of layer `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`MapSurfaceError::UnknownLayer`] when the layer is missing.
    fn set_paint_property(
        &self,
        layer: &str,
        property: &str,
        value: Value,
    ) -> Result<(), MapSurfaceError>;

    /// Change the canvas cursor.
    fn set_cursor(&self, cursor: Cursor);

    /// Features rendered at `point` in the given layers, topmost first.
    fn query_rendered_features(
        &self,
        point: &ClickPoint,
        layers: &[&'static str],
    ) -> Vec<Feature>;

    /// Swap the base style. Sources and layers are dropped; the surface
    /// reports completion through a style-loaded event.
    fn set_style(&self, url: &str);

    /// Animate the camera to `center` at `zoom`.
    fn fly_to(&self, center: LngLat, zoom: f64);

    /// Fit the camera to `bounds`, keeping `padding` pixels free on each side.
    fn fit_bounds(&self, bounds: ViewportBounds, padding: u32);

    /// Release the renderer.
    fn teardown(&self);
}
