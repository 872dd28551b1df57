//! The single selected feature and its display headings.

use serde_json::Value;

use super::bounds::LngLat;
use super::geojson::{Geometry, Properties};

/// Zero or one selected feature; `None` at the call sites means cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A building footprint or point.
    Building {
        /// Feature attributes.
        properties: Properties,
        /// Feature geometry.
        geometry: Geometry,
        /// Coordinate used for the zonage lookup.
        lng_lat: LngLat,
    },
    /// A zoning polygon.
    Zone {
        /// Feature attributes.
        properties: Properties,
        /// Feature geometry.
        geometry: Geometry,
    },
    /// A land-use polygon.
    LandUse {
        /// Feature attributes.
        properties: Properties,
        /// Feature geometry.
        geometry: Geometry,
    },
}

impl Selection {
    /// Attributes of the selected feature.
    pub const fn properties(&self) -> &Properties {
        match self {
            Self::Building { properties, .. }
            | Self::Zone { properties, .. }
            | Self::LandUse { properties, .. } => properties,
        }
    }

    /// Geometry of the selected feature.
    pub const fn geometry(&self) -> &Geometry {
        match self {
            Self::Building { geometry, .. }
            | Self::Zone { geometry, .. }
            | Self::LandUse { geometry, .. } => geometry,
        }
    }

    /// Lookup coordinate; only buildings carry one.
    pub const fn lng_lat(&self) -> Option<LngLat> {
        match self {
            Self::Building { lng_lat, .. } => Some(*lng_lat),
            Self::Zone { .. } | Self::LandUse { .. } => None,
        }
    }

    /// Panel heading.
    pub fn title(&self) -> String {
        let props = self.properties();
        match self {
            Self::Building { .. } => {
                property_text(props, "address").unwrap_or_else(|| "Building".to_owned())
            }
            Self::Zone { .. } => format!(
                "Zone: {}",
                property_text(props, "zoneCode").unwrap_or_else(|| "N/A".to_owned())
            ),
            Self::LandUse { .. } => property_text(props, "affectationEn")
                .or_else(|| property_text(props, "affectation"))
                .unwrap_or_else(|| "Land Use".to_owned()),
        }
    }

    /// Secondary heading, when the feature has one.
    pub fn subtitle(&self) -> Option<String> {
        match self {
            Self::Building { properties, .. } => property_text(properties, "neighborhood"),
            Self::Zone { properties, .. } => property_text(properties, "arrondissement"),
            Self::LandUse { .. } => None,
        }
    }
}

/// Render a property as text; `null` and missing values yield `None`.
pub fn property_text(properties: &Properties, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
