//! DTOs for decoding the data service's GeoJSON responses.
//!
//! The service's collections are decoded leniently first (missing `type`,
//! `null` properties), then mapped into domain features in one pass that
//! rejects non-finite coordinates.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Feature, FeatureCollection, FeatureId, Geometry, Properties};

#[derive(Debug, Deserialize)]
pub(super) struct FeatureCollectionDto {
    #[serde(default)]
    pub(super) features: Vec<FeatureDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeatureDto {
    #[serde(default)]
    pub(super) id: Option<FeatureId>,
    #[serde(default)]
    pub(super) geometry: Option<Geometry>,
    #[serde(default)]
    pub(super) properties: Option<Value>,
}

impl FeatureCollectionDto {
    pub(super) fn into_domain(self) -> Result<FeatureCollection, String> {
        self.features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| feature.into_domain(index))
            .collect::<Result<Vec<_>, _>>()
            .map(FeatureCollection::new)
    }
}

impl FeatureDto {
    fn into_domain(self, index: usize) -> Result<Feature, String> {
        let non_finite = self.geometry.as_ref().is_some_and(|geometry| {
            geometry
                .positions()
                .iter()
                .flatten()
                .any(|value| !value.is_finite())
        });
        if non_finite {
            return Err(format!(
                "feature {} ({}) includes non-finite coordinates",
                index,
                self.id.map_or_else(|| "no id".to_owned(), |id| id.to_string()),
            ));
        }

        let properties = match self.properties {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Properties::new(),
            Some(other) => {
                return Err(format!(
                    "feature {index} properties must be an object, got {other}"
                ));
            }
        };

        Ok(Feature {
            id: self.id,
            geometry: self.geometry,
            properties,
        })
    }
}
