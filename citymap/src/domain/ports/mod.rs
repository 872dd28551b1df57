//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod feature_source;
mod map_surface;

#[cfg(test)]
pub use feature_source::MockFeatureSource;
pub use feature_source::{FeatureSource, FeatureSourceError, FixtureFeatureSource};
#[cfg(test)]
pub use map_surface::MockMapSurface;
pub use map_surface::{
    Camera, ClickPoint, Cursor, GeometryFilter, LayerKind, LayerSpec, MapSurface,
    MapSurfaceError,
};
