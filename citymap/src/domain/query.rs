//! Feature kinds, user filters, and request parameter serialisation.

use super::areas::ArrondissementRef;
use super::bounds::ViewportBounds;

/// Feature layers served by bounding-box search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Building footprints and points.
    Buildings,
    /// Zoning polygons.
    Zones,
    /// Land-use polygons.
    LandUse,
}

impl FeatureKind {
    /// Stable lowercase label for logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Zones => "zones",
            Self::LandUse => "land_use",
        }
    }

    /// Whether the endpoint accepts the attribute filters.
    pub const fn accepts_filters(self) -> bool {
        matches!(self, Self::Buildings | Self::Zones)
    }
}

/// Inclusive numeric range where either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueRange {
    /// Lower bound.
    pub min: Option<i32>,
    /// Upper bound.
    pub max: Option<i32>,
}

impl ValueRange {
    /// Build a range.
    pub const fn new(min: Option<i32>, max: Option<i32>) -> Self {
        Self { min, max }
    }
}

/// User-chosen constraints on the displayed data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    /// Neighbourhood name.
    pub neighborhood: Option<String>,
    /// Building type label.
    pub building_type: Option<String>,
    /// Construction year range.
    pub year_built: ValueRange,
    /// Floor count range.
    pub floors: ValueRange,
    /// Explicit administrative-area names; sent as repeated parameters.
    pub arrondissements: Vec<String>,
    /// Selected administrative area.
    pub area: Option<ArrondissementRef>,
    /// Selected zone code within the area.
    pub zone_code: Option<String>,
}

impl FilterState {
    /// Borough code contributed by the selected area.
    pub fn borough(&self) -> Option<&str> {
        self.area.as_ref().and_then(|area| area.code_rem.as_deref())
    }
}

/// Bounds plus filters for one bounding-box request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    /// Rounded viewport bounds.
    pub bounds: ViewportBounds,
    /// Filters in effect when the request was issued.
    pub filters: FilterState,
}

impl FeatureQuery {
    /// Build a query from already rounded bounds.
    pub const fn new(bounds: ViewportBounds, filters: FilterState) -> Self {
        Self { bounds, filters }
    }

    /// Ordered query-string pairs for `kind`.
    ///
    /// Only present filter fields are emitted. A non-empty `arrondissements`
    /// list takes precedence over the single `borough` code.
    ///
    /// # Examples
    /// ```
    /// use citymap::domain::{FeatureKind, FeatureQuery, FilterState, ViewportBounds};
    ///
    /// let query = FeatureQuery::new(
    ///     ViewportBounds::new(-73.6, 45.5, -73.5, 45.6),
    ///     FilterState { neighborhood: Some("Plateau".to_owned()), ..FilterState::default() },
    /// );
    /// let pairs = query.query_pairs(FeatureKind::Buildings);
    /// assert_eq!(pairs.len(), 5);
    /// assert_eq!(pairs[4], ("neighborhood", "Plateau".to_owned()));
    /// ```
    pub fn query_pairs(&self, kind: FeatureKind) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("minLng", self.bounds.min_lng.to_string()),
            ("minLat", self.bounds.min_lat.to_string()),
            ("maxLng", self.bounds.max_lng.to_string()),
            ("maxLat", self.bounds.max_lat.to_string()),
        ];
        if !kind.accepts_filters() {
            return pairs;
        }

        let filters = &self.filters;
        push_some(&mut pairs, "neighborhood", filters.neighborhood.clone());
        push_some(&mut pairs, "buildingType", filters.building_type.clone());
        push_some(&mut pairs, "minYearBuilt", filters.year_built.min);
        push_some(&mut pairs, "maxYearBuilt", filters.year_built.max);
        push_some(&mut pairs, "minFloors", filters.floors.min);
        push_some(&mut pairs, "maxFloors", filters.floors.max);

        if filters.arrondissements.is_empty() {
            push_some(&mut pairs, "borough", filters.borough());
        } else {
            pairs.extend(
                filters
                    .arrondissements
                    .iter()
                    .map(|name| ("arrondissements", name.clone())),
            );
        }
        pairs
    }
}

fn push_some<T: ToString>(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: Option<T>,
) {
    if let Some(present) = value {
        let rendered = present.to_string();
        if !rendered.trim().is_empty() {
            pairs.push((key, rendered));
        }
    }
}
