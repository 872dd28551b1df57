//! Builders for the feature payloads the data service returns.

use serde_json::{Value, json};

use crate::domain::{ArrondissementRef, Feature, FeatureId, Geometry, Properties, Zonage};

/// Closed square ring centred on `(lng, lat)` with half-width `half`.
pub fn square(lng: f64, lat: f64, half: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        [lng - half, lat - half],
        [lng + half, lat - half],
        [lng + half, lat + half],
        [lng - half, lat + half],
        [lng - half, lat - half],
    ]])
}

/// Feature with string id `id`, `geometry`, and `properties` from a JSON object.
///
/// Non-object `properties` values produce an empty property map.
pub fn feature(id: &str, geometry: Geometry, properties: &Value) -> Feature {
    let map: Properties = properties.as_object().cloned().unwrap_or_default();
    Feature::new(Some(FeatureId::from(id)), geometry, map)
}

/// Building polygon at `(lng, lat)` carrying an address.
pub fn building(id: &str, lng: f64, lat: f64, address: &str) -> Feature {
    feature(
        id,
        square(lng, lat, 0.0005),
        &json!({ "address": address, "neighborhood": "Plateau-Mont-Royal" }),
    )
}

/// Building point at `(lng, lat)` carrying an address.
pub fn building_point(id: &str, lng: f64, lat: f64, address: &str) -> Feature {
    feature(
        id,
        Geometry::Point([lng, lat]),
        &json!({ "address": address }),
    )
}

/// Zone polygon at `(lng, lat)` with zone code `code`.
pub fn zone(id: &str, lng: f64, lat: f64, code: &str) -> Feature {
    feature(
        id,
        square(lng, lat, 0.002),
        &json!({ "zoneCode": code, "arrondissement": "Verdun" }),
    )
}

/// Land-use polygon at `(lng, lat)`.
pub fn land_use(id: &str, lng: f64, lat: f64, label: &str) -> Feature {
    feature(
        id,
        square(lng, lat, 0.004),
        &json!({ "affectationEn": label, "affectation": label, "areaSqm": 1_500_000 }),
    )
}

/// Administrative boundary polygon for area `code3l`.
pub fn boundary(code3l: &str, lng: f64, lat: f64, half: f64) -> Feature {
    feature(
        code3l,
        square(lng, lat, half),
        &json!({ "code_3c": code3l, "nom": code3l }),
    )
}

/// Area reference record with `code3l` and `code_rem`.
pub fn arrondissement(id: i64, name: &str, code3l: &str, code_rem: &str) -> ArrondissementRef {
    ArrondissementRef {
        id,
        nom_officiel: name.to_owned(),
        nom_abrege: None,
        acronyme: None,
        code3l: code3l.to_owned(),
        id_uadm: None,
        no_arro_election: None,
        code_rem: Some(code_rem.to_owned()),
    }
}

/// Zoning record with zone code `code`.
pub fn zonage(id: i64, code: &str) -> Zonage {
    Zonage {
        id,
        zone_code: Some(code.to_owned()),
        ..Zonage::default()
    }
}
