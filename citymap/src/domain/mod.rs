//! Domain types, ports, and the viewport coordinator.
//!
//! Purpose: model what the map displays and decide when it changes. The
//! domain owns feature collections, filters, selections, zonage lookups, and
//! the layer plan; adapters in `outbound` supply data and render it.
//!
//! Public surface:
//! - `ViewportCoordinator`: fetch cycles, area filters, clicks, styles.
//! - `FeatureSource` / `MapSurface`: driven ports implemented by adapters.
//! - `DetailPanel` / `StatusLine`: what the side panel and status line show.

pub mod areas;
pub mod bounds;
pub mod coordinator;
pub mod detail;
pub mod geojson;
pub mod ports;
pub mod presentation;
pub mod query;
pub mod selection;
pub mod zonage;

pub use self::areas::{
    ArrondissementRef, BOUNDARY_CODE_PROPERTY, ZoneCodeSet, sort_by_official_name,
};
pub use self::bounds::{LngLat, ViewportBounds, round_coordinate};
pub use self::coordinator::{
    AREA_FIT_PADDING, CoordinatorError, CycleOutcome, FetchEpoch, InitialView, StatusLine,
    ViewSnapshot, ViewportCoordinator, ViewportCoordinatorConfig, ViewportCoordinatorPorts,
};
pub use self::detail::{DetailPanel, DetailRow, DetailSection, ZonagePanel, external_map_link};
pub use self::geojson::{
    Feature, FeatureCollection, FeatureId, Geometry, GeometryKind, Position, Properties,
};
pub use self::presentation::{MapStyle, PresentationPlan, UnknownMapStyle};
pub use self::query::{FeatureKind, FeatureQuery, FilterState, ValueRange};
pub use self::selection::Selection;
pub use self::zonage::{LookupTicket, Zonage, ZonageLookup, ZonageTracker};
