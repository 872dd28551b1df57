//! Mutable view state owned by the coordinator.
//!
//! Everything here is plain data guarded by the coordinator's mutex. Derived
//! collections (displayed zones and boundaries) are recomputed eagerly so the
//! map always receives exactly what the state says is displayed.

use crate::domain::presentation::DisplayedData;
use crate::domain::{
    ArrondissementRef, BOUNDARY_CODE_PROPERTY, FeatureCollection, FilterState, MapStyle,
    Selection, ZonageTracker, ZoneCodeSet,
};

use super::epoch::EpochCounter;

/// Feature property holding a zone's code.
const ZONE_CODE_PROPERTY: &str = "zoneCode";

#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub(crate) mounted: bool,
    pub(crate) epochs: EpochCounter,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
    pub(crate) filters: FilterState,

    pub(crate) buildings: FeatureCollection,
    pub(crate) fetched_zones: FeatureCollection,
    pub(crate) zones: FeatureCollection,
    pub(crate) land_use: FeatureCollection,
    pub(crate) all_boundaries: FeatureCollection,
    pub(crate) boundaries: FeatureCollection,
    pub(crate) highlight: FeatureCollection,

    pub(crate) zone_codes: ZoneCodeSet,
    pub(crate) zone_code_generation: u64,
    pub(crate) arrondissement_refs: Vec<ArrondissementRef>,
    pub(crate) arrondissement_names: Vec<String>,

    pub(crate) selection: Option<Selection>,
    pub(crate) zonage: ZonageTracker,
    pub(crate) style: MapStyle,
}

impl ViewState {
    pub(crate) fn displayed(&self) -> DisplayedData<'_> {
        DisplayedData {
            buildings: &self.buildings,
            admin_boundaries: &self.boundaries,
            zones: &self.zones,
            land_use: &self.land_use,
            highlight: &self.highlight,
        }
    }

    /// Recompute the displayed zone subset from the fetched zones.
    pub(crate) fn recompute_zones(&mut self) {
        self.zones = displayed_zones(
            &self.fetched_zones,
            self.filters.area.is_some(),
            &self.zone_codes,
            self.filters.zone_code.as_deref(),
        );
    }

    /// Recompute the displayed boundaries for the selected area.
    pub(crate) fn recompute_boundaries(&mut self) {
        self.boundaries = match &self.filters.area {
            None => FeatureCollection::empty(),
            Some(area) => self.all_boundaries.filtered(|feature| {
                feature.property_str(BOUNDARY_CODE_PROPERTY) == Some(area.code3l.as_str())
            }),
        };
    }

    pub(crate) fn find_area(&self, code3l: &str) -> Option<ArrondissementRef> {
        self.arrondissement_refs
            .iter()
            .find(|area| area.code3l == code3l)
            .cloned()
    }

    /// Whether a zone-code response for `generation` may still be applied.
    pub(crate) fn zone_codes_current(&self, generation: u64, code3l: &str) -> bool {
        self.zone_code_generation == generation
            && self
                .filters
                .area
                .as_ref()
                .is_some_and(|area| area.code3l == code3l)
    }
}

/// Narrow `fetched` to what the area and zone-code filters admit.
///
/// Without an area every fetched zone is shown. With an area whose code set
/// is still loading nothing is shown.
pub(crate) fn displayed_zones(
    fetched: &FeatureCollection,
    area_selected: bool,
    codes: &ZoneCodeSet,
    zone_code: Option<&str>,
) -> FeatureCollection {
    if !area_selected {
        return fetched.clone();
    }
    fetched.filtered(|feature| {
        feature
            .property_str(ZONE_CODE_PROPERTY)
            .is_some_and(|code| codes.admits(code) && zone_code.is_none_or(|wanted| wanted == code))
    })
}

#[cfg(test)]
mod tests {
    //! Derived zone and boundary subsets.

    use super::*;
    use crate::domain::{Feature, Geometry, Properties};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn feature_with(key: &str, value: &str) -> Feature {
        let mut properties = Properties::new();
        properties.insert(key.to_owned(), json!(value));
        Feature::new(None, Geometry::Polygon(Vec::new()), properties)
    }

    #[fixture]
    fn zones() -> FeatureCollection {
        FeatureCollection::new(vec![
            feature_with(ZONE_CODE_PROPERTY, "R-1"),
            feature_with(ZONE_CODE_PROPERTY, "C-2"),
            feature_with(ZONE_CODE_PROPERTY, "I-3"),
        ])
    }

    fn codes(values: &[&str]) -> ZoneCodeSet {
        values.iter().map(|code| (*code).to_owned()).collect()
    }

    #[rstest]
    fn no_area_shows_everything(zones: FeatureCollection) {
        let shown = displayed_zones(&zones, false, &ZoneCodeSet::Loading, None);
        assert_eq!(shown, zones);
    }

    #[rstest]
    fn loading_codes_show_nothing(zones: FeatureCollection) {
        let shown = displayed_zones(&zones, true, &ZoneCodeSet::Loading, None);
        assert!(shown.is_empty());
    }

    #[rstest]
    fn loaded_codes_narrow_and_zone_code_narrows_further(zones: FeatureCollection) {
        let set = codes(&["R-1", "C-2"]);
        assert_eq!(displayed_zones(&zones, true, &set, None).len(), 2);

        let narrowed = displayed_zones(&zones, true, &set, Some("C-2"));
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed.features[0].property_str(ZONE_CODE_PROPERTY), Some("C-2"));

        assert!(displayed_zones(&zones, true, &set, Some("I-3")).is_empty());
    }

    #[test]
    fn boundaries_follow_selected_area() {
        let mut state = ViewState {
            all_boundaries: FeatureCollection::new(vec![
                feature_with(BOUNDARY_CODE_PROPERTY, "VER"),
                feature_with(BOUNDARY_CODE_PROPERTY, "LAS"),
            ]),
            ..ViewState::default()
        };
        state.recompute_boundaries();
        assert!(state.boundaries.is_empty());

        state.filters.area = Some(ArrondissementRef {
            id: 1,
            nom_officiel: "Verdun".to_owned(),
            nom_abrege: None,
            acronyme: None,
            code3l: "VER".to_owned(),
            id_uadm: None,
            no_arro_election: None,
            code_rem: Some("VD".to_owned()),
        });
        state.recompute_boundaries();
        assert_eq!(state.boundaries.len(), 1);
        assert_eq!(
            state.boundaries.features[0].property_str(BOUNDARY_CODE_PROPERTY),
            Some("VER")
        );
    }
}
