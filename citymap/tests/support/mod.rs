//! Shared harness for citymap integration tests.
//!
//! Integration tests compile as separate crates under `citymap/tests/`; this
//! module wires a scripted data service and a headless map into a
//! coordinator so each suite starts from the same viewport.

use std::sync::Arc;

use citymap::domain::ports::Camera;
use citymap::domain::{
    LngLat, ViewportBounds, ViewportCoordinator, ViewportCoordinatorConfig,
    ViewportCoordinatorPorts,
};
use citymap::outbound::headless::HeadlessMap;
use citymap::test_support::scripted_source::ScriptedFeatureSource;

/// Longitude of the test viewport centre.
pub const CENTER_LNG: f64 = -73.57;
/// Latitude of the test viewport centre.
pub const CENTER_LAT: f64 = 45.5;

/// Camera over the test viewport at `zoom`.
pub fn camera(zoom: f64) -> Camera {
    Camera {
        center: LngLat::new(CENTER_LNG, CENTER_LAT),
        zoom,
        bounds: ViewportBounds::new(
            CENTER_LNG - 0.012_345_67,
            CENTER_LAT - 0.012_345_67,
            CENTER_LNG + 0.012_345_67,
            CENTER_LAT + 0.012_345_67,
        ),
    }
}

/// A coordinator wired to scripted doubles.
pub struct Harness {
    pub source: Arc<ScriptedFeatureSource>,
    pub map: Arc<HeadlessMap>,
    pub coordinator: Arc<ViewportCoordinator>,
}

impl Harness {
    /// Harness at `zoom` with `config`.
    pub fn with_config(zoom: f64, config: ViewportCoordinatorConfig) -> Self {
        let source = Arc::new(ScriptedFeatureSource::new());
        let map = Arc::new(HeadlessMap::new(camera(zoom)));
        let coordinator = Arc::new(ViewportCoordinator::new(
            ViewportCoordinatorPorts::new(source.clone(), map.clone()),
            config,
        ));
        Self {
            source,
            map,
            coordinator,
        }
    }

    /// Harness at `zoom` with default configuration.
    pub fn at_zoom(zoom: f64) -> Self {
        Self::with_config(zoom, ViewportCoordinatorConfig::default())
    }

    /// Number of calls the scripted source has seen.
    pub fn call_count(&self) -> usize {
        self.source.calls().len()
    }
}
