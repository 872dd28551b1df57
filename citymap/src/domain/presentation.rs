//! Static layer plan and its idempotent installation onto a map surface.
//!
//! [`install`] is the only way sources and layers reach the map. It runs on
//! first load and again after every style swap, so it must converge to the
//! same map from any starting point: existing sources receive fresh data,
//! missing ones are created, and only missing layers are added.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use super::geojson::FeatureCollection;
use super::ports::{GeometryFilter, LayerKind, LayerSpec, MapSurface, MapSurfaceError};

/// Building footprints and points.
pub const BUILDINGS_SOURCE: &str = "buildings";
/// Administrative boundaries for the selected area.
pub const ADMIN_SOURCE: &str = "admin-boundaries";
/// Zoning polygons.
pub const ZONES_SOURCE: &str = "zones";
/// Land-use polygons.
pub const LAND_USE_SOURCE: &str = "land-use";
/// Selection outline.
pub const HIGHLIGHT_SOURCE: &str = "highlight";

/// Building polygon fill.
pub const BUILDINGS_POLY: &str = "buildings-poly";
/// Building polygon outline.
pub const BUILDINGS_POLY_OUTLINE: &str = "buildings-poly-outline";
/// Building point circles.
pub const BUILDINGS_POINT: &str = "buildings-point";
/// Dashed boundary line.
pub const ADMIN_LINE: &str = "admin-boundaries-line";
/// Boundary name label.
pub const ADMIN_LABEL: &str = "admin-boundaries-label";
/// Zone fill.
pub const ZONES_FILL: &str = "zones-fill";
/// Zone outline.
pub const ZONES_LINE: &str = "zones-line";
/// Land-use fill.
pub const LAND_USE_FILL: &str = "land-use-fill";
/// Land-use outline.
pub const LAND_USE_LINE: &str = "land-use-line";
/// Highlight outline.
pub const HIGHLIGHT_LINE: &str = "highlight-line";

/// Building layers queried on click, in priority order.
pub const BUILDING_LAYERS: [&str; 3] = [BUILDINGS_POLY, BUILDINGS_POLY_OUTLINE, BUILDINGS_POINT];
/// Zone layers queried on click.
pub const ZONE_LAYERS: [&str; 2] = [ZONES_FILL, ZONES_LINE];
/// Land-use layers queried on click.
pub const LAND_USE_LAYERS: [&str; 2] = [LAND_USE_FILL, LAND_USE_LINE];

/// Opacity swap applied while the pointer is over a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverRule {
    /// Layer the rule watches.
    pub layer: &'static str,
    /// Paint property toggled.
    pub property: &'static str,
    /// Value at rest.
    pub rest: f64,
    /// Value while hovered.
    pub hover: f64,
}

/// Hover feedback for building polygons and zones.
pub static HOVER_RULES: [HoverRule; 2] = [
    HoverRule {
        layer: BUILDINGS_POLY,
        property: "fill-opacity",
        rest: 0.15,
        hover: 0.35,
    },
    HoverRule {
        layer: ZONES_FILL,
        property: "fill-opacity",
        rest: 0.15,
        hover: 0.25,
    },
];

/// Look up the hover rule for `layer`.
pub fn hover_rule(layer: &str) -> Option<&'static HoverRule> {
    HOVER_RULES.iter().find(|rule| rule.layer == layer)
}

/// Collections currently displayed; the single source of truth for
/// re-installation after a style swap.
#[derive(Debug, Clone, Copy)]
pub struct DisplayedData<'a> {
    /// Buildings.
    pub buildings: &'a FeatureCollection,
    /// Filtered administrative boundaries.
    pub admin_boundaries: &'a FeatureCollection,
    /// Filtered zones.
    pub zones: &'a FeatureCollection,
    /// Land use.
    pub land_use: &'a FeatureCollection,
    /// Selection highlight.
    pub highlight: &'a FeatureCollection,
}

impl DisplayedData<'_> {
    fn for_source(&self, source: &str) -> Option<&FeatureCollection> {
        match source {
            BUILDINGS_SOURCE => Some(self.buildings),
            ADMIN_SOURCE => Some(self.admin_boundaries),
            ZONES_SOURCE => Some(self.zones),
            LAND_USE_SOURCE => Some(self.land_use),
            HIGHLIGHT_SOURCE => Some(self.highlight),
            _ => None,
        }
    }
}

/// Sources and layers in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationPlan {
    /// Source identifiers in creation order.
    pub sources: Vec<&'static str>,
    /// Layers bottom to top.
    pub layers: Vec<LayerSpec>,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn layer(
    id: &'static str,
    kind: LayerKind,
    source: &'static str,
    filter: GeometryFilter,
    paint: Value,
) -> LayerSpec {
    LayerSpec {
        id,
        kind,
        source,
        filter,
        paint: object(paint),
        layout: Map::new(),
    }
}

impl PresentationPlan {
    /// Build the plan; land-use layers are included only when enabled.
    pub fn new(land_use_enabled: bool) -> Self {
        let mut sources = vec![BUILDINGS_SOURCE, ADMIN_SOURCE, ZONES_SOURCE];
        let mut layers = vec![
            layer(
                BUILDINGS_POLY,
                LayerKind::Fill,
                BUILDINGS_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "fill-color": "#e8f5e9", "fill-opacity": 0.15 }),
            ),
            layer(
                BUILDINGS_POLY_OUTLINE,
                LayerKind::Line,
                BUILDINGS_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "line-color": "#2e7d32", "line-width": 1.2 }),
            ),
            layer(
                BUILDINGS_POINT,
                LayerKind::Circle,
                BUILDINGS_SOURCE,
                GeometryFilter::Point,
                json!({
                    "circle-radius": 5,
                    "circle-color": "#2e7d32",
                    "circle-opacity": 0.7,
                    "circle-stroke-width": 1,
                    "circle-stroke-color": "#FFFFFF"
                }),
            ),
            layer(
                ADMIN_LINE,
                LayerKind::Line,
                ADMIN_SOURCE,
                GeometryFilter::Any,
                json!({
                    "line-color": "#78909c",
                    "line-width": 1.5,
                    "line-dasharray": [4, 2],
                    "line-opacity": 0.6
                }),
            ),
            LayerSpec {
                layout: object(json!({
                    "text-field": ["get", "name"],
                    "text-size": 14,
                    "text-anchor": "center",
                    "text-allow-overlap": false
                })),
                ..layer(
                    ADMIN_LABEL,
                    LayerKind::Symbol,
                    ADMIN_SOURCE,
                    GeometryFilter::Any,
                    json!({
                        "text-color": "#546e7a",
                        "text-halo-color": "#FFFFFF",
                        "text-halo-width": 1.5
                    }),
                )
            },
            layer(
                ZONES_FILL,
                LayerKind::Fill,
                ZONES_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "fill-color": "#00695c", "fill-opacity": 0.15 }),
            ),
            layer(
                ZONES_LINE,
                LayerKind::Line,
                ZONES_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "line-color": "#00695c", "line-width": 2.5, "line-opacity": 1 }),
            ),
        ];

        if land_use_enabled {
            sources.push(LAND_USE_SOURCE);
            layers.push(layer(
                LAND_USE_FILL,
                LayerKind::Fill,
                LAND_USE_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "fill-color": "#a1887f", "fill-opacity": 0.2 }),
            ));
            layers.push(layer(
                LAND_USE_LINE,
                LayerKind::Line,
                LAND_USE_SOURCE,
                GeometryFilter::Polygonal,
                json!({ "line-color": "#6d4c41", "line-width": 1, "line-opacity": 0.8 }),
            ));
        }

        sources.push(HIGHLIGHT_SOURCE);
        layers.push(layer(
            HIGHLIGHT_LINE,
            LayerKind::Line,
            HIGHLIGHT_SOURCE,
            GeometryFilter::Any,
            json!({ "line-color": "#1565c0", "line-width": 2.5, "line-opacity": 0.9 }),
        ));

        Self { sources, layers }
    }

    /// Layer definition by identifier.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|spec| spec.id == id)
    }
}

/// Bring `map` in line with `plan`, publishing `data` into every source.
///
/// Safe to call any number of times; a second call on an unchanged map only
/// re-publishes data.
///
/// # Errors
///
/// Propagates the first surface failure.
pub fn install(
    map: &dyn MapSurface,
    plan: &PresentationPlan,
    data: &DisplayedData<'_>,
) -> Result<(), MapSurfaceError> {
    let empty = FeatureCollection::empty();
    for source in &plan.sources {
        let collection = data.for_source(source).unwrap_or(&empty);
        if map.has_source(source) {
            map.set_source_data(source, collection)?;
        } else {
            map.add_source(source, collection)?;
        }
    }

    let mut added = 0_usize;
    for spec in &plan.layers {
        if !map.has_layer(spec.id) {
            map.add_layer(spec)?;
            added += 1;
        }
    }
    debug!(
        sources = plan.sources.len(),
        layers_added = added,
        "presentation installed"
    );
    Ok(())
}

/// Base map styles offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    /// Light grey basemap.
    #[default]
    Positron,
    /// Satellite imagery with labels.
    Hybrid,
    /// Street map.
    Streets,
}

impl MapStyle {
    /// Path segment of the style on the tile provider.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Positron => "positron",
            Self::Hybrid => "hybrid",
            Self::Streets => "streets-v2",
        }
    }

    /// Style document URL under `base`, with `key` as a query parameter
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot carry path segments.
    ///
    /// # Examples
    /// ```
    /// use citymap::domain::MapStyle;
    /// use url::Url;
    ///
    /// let base = Url::parse("https://tiles.example.com/maps/").expect("base");
    /// let url = MapStyle::Streets.style_url(&base, Some("k1")).expect("url");
    /// assert_eq!(url.as_str(), "https://tiles.example.com/maps/streets-v2/style.json?key=k1");
    /// ```
    pub fn style_url(self, base: &Url, key: Option<&str>) -> Result<Url, url::ParseError> {
        let mut root = base.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let mut url = root.join(&format!("{}/style.json", self.slug()))?;
        if let Some(present) = key.filter(|candidate| !candidate.is_empty()) {
            url.query_pairs_mut().append_pair("key", present);
        }
        Ok(url)
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positron => "positron",
            Self::Hybrid => "hybrid",
            Self::Streets => "streets",
        })
    }
}

/// Error returned when parsing an unknown style name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown map style: {0}")]
pub struct UnknownMapStyle(pub String);

impl FromStr for MapStyle {
    type Err = UnknownMapStyle;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positron" => Ok(Self::Positron),
            "hybrid" => Ok(Self::Hybrid),
            "streets" | "streets-v2" => Ok(Self::Streets),
            other => Err(UnknownMapStyle(other.to_owned())),
        }
    }
}
