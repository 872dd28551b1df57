//! Resolving a map click into a selection.

use crate::domain::ports::{ClickPoint, MapSurface};
use crate::domain::presentation::{BUILDING_LAYERS, LAND_USE_LAYERS, ZONE_LAYERS};
use crate::domain::{Feature, Geometry, GeometryKind, Properties, Selection};

/// What a click landed on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClickHit {
    /// A feature to select.
    Selected(Selection),
    /// Empty space.
    Nothing,
    /// Buildings were hit but none carried a usable geometry.
    Unresolved,
}

/// Query the map at `point` in priority order: buildings, zones, land use.
///
/// Within buildings a polygonal feature wins over a point. A building point
/// supplies its own coordinate for the zonage lookup; polygons use the click
/// coordinate.
pub(crate) fn resolve_click(
    map: &dyn MapSurface,
    point: &ClickPoint,
    land_use_enabled: bool,
) -> ClickHit {
    let buildings = map.query_rendered_features(point, &BUILDING_LAYERS);
    if !buildings.is_empty() {
        return pick_building(&buildings, point).map_or(ClickHit::Unresolved, ClickHit::Selected);
    }

    let zones = map.query_rendered_features(point, &ZONE_LAYERS);
    if let Some((properties, geometry)) = zones.into_iter().find_map(into_parts) {
        return ClickHit::Selected(Selection::Zone {
            properties,
            geometry,
        });
    }

    if land_use_enabled {
        let land_use = map.query_rendered_features(point, &LAND_USE_LAYERS);
        if let Some((properties, geometry)) = land_use.into_iter().find_map(into_parts) {
            return ClickHit::Selected(Selection::LandUse {
                properties,
                geometry,
            });
        }
    }

    ClickHit::Nothing
}

fn pick_building(hits: &[Feature], point: &ClickPoint) -> Option<Selection> {
    let has_kind = |feature: &&Feature, wanted: fn(GeometryKind) -> bool| {
        feature
            .geometry
            .as_ref()
            .is_some_and(|geometry| wanted(geometry.kind()))
    };
    let chosen = hits
        .iter()
        .find(|feature| {
            has_kind(feature, |kind| {
                matches!(kind, GeometryKind::Polygon | GeometryKind::MultiPolygon)
            })
        })
        .or_else(|| {
            hits.iter()
                .find(|feature| has_kind(feature, |kind| kind == GeometryKind::Point))
        })?;

    let geometry = chosen.geometry.clone()?;
    let lng_lat = geometry.as_point().unwrap_or(point.lng_lat);
    Some(Selection::Building {
        properties: chosen.properties.clone(),
        geometry,
        lng_lat,
    })
}

fn into_parts(feature: Feature) -> Option<(Properties, Geometry)> {
    let Feature {
        geometry,
        properties,
        ..
    } = feature;
    geometry.map(|present| (properties, present))
}
