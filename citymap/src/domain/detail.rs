//! Detail-panel model for the current selection.
//!
//! The panel is plain data: headings, labelled rows, and the zonage block.
//! Rendering is left to whatever surface displays it.

use std::fmt;

use serde_json::Value;

use super::bounds::LngLat;
use super::geojson::Properties;
use super::selection::{Selection, property_text};
use super::zonage::{Zonage, ZonageLookup};

/// Placeholder for absent values.
pub const MISSING: &str = "—";

const SQUARE_METRES_PER_KM2: f64 = 1_000_000.0;

/// Render an optional value, substituting [`MISSING`] for absent or
/// non-finite input.
pub fn fmt_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_owned(),
        Some(Value::String(text)) if text.is_empty() => MISSING.to_owned(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) if !float.is_finite() => MISSING.to_owned(),
            _ => number.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn fmt_number(value: Option<f64>) -> String {
    match value {
        Some(number) if number.is_finite() => number.to_string(),
        _ => MISSING.to_owned(),
    }
}

fn fmt_text(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => MISSING.to_owned(),
    }
}

fn fmt_range(min: &str, max: &str) -> String {
    format!("{min} — {max}")
}

/// One labelled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    /// Row label.
    pub label: &'static str,
    /// Rendered value.
    pub value: String,
}

impl DetailRow {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// A titled group of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSection {
    /// Section heading.
    pub heading: &'static str,
    /// Rows in display order.
    pub rows: Vec<DetailRow>,
}

/// The zonage block of a building panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZonagePanel {
    /// Placeholder while the lookup is in flight.
    Loading,
    /// The lookup failed; the surface offers a retry.
    Failed {
        /// Displayable message.
        message: String,
    },
    /// No zoning covers the building.
    Empty,
    /// Zoning rows.
    Rows(Vec<DetailRow>),
}

impl ZonagePanel {
    /// Text shown for the empty state.
    pub const EMPTY_TEXT: &'static str = "No zonage data available";

    fn from_lookup(lookup: &ZonageLookup) -> Self {
        match lookup {
            ZonageLookup::Idle | ZonageLookup::Loading => Self::Loading,
            ZonageLookup::Failed(message) => Self::Failed {
                message: message.clone(),
            },
            ZonageLookup::Loaded(None) => Self::Empty,
            ZonageLookup::Loaded(Some(zonage)) => Self::Rows(zonage_rows(zonage)),
        }
    }
}

impl fmt::Display for ZonagePanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading zonage…"),
            Self::Failed { message } => write!(f, "{message} (retry available)"),
            Self::Empty => f.write_str(Self::EMPTY_TEXT),
            Self::Rows(rows) => {
                let rendered: Vec<String> = rows
                    .iter()
                    .map(|row| format!("{}: {}", row.label, row.value))
                    .collect();
                f.write_str(&rendered.join("; "))
            }
        }
    }
}

/// Complete panel for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    /// Panel heading.
    pub title: String,
    /// Secondary heading.
    pub subtitle: Option<String>,
    /// Attribute sections.
    pub sections: Vec<DetailSection>,
    /// Zonage block; buildings only.
    pub zonage: Option<ZonagePanel>,
    /// External map link; buildings only.
    pub external_link: Option<String>,
}

impl DetailPanel {
    /// Build the panel for `selection` with the current zonage state.
    pub fn build(selection: &Selection, zonage: &ZonageLookup) -> Self {
        let title = selection.title();
        let subtitle = selection.subtitle();
        match selection {
            Selection::Building {
                properties,
                lng_lat,
                ..
            } => Self {
                title,
                subtitle,
                sections: vec![building_section(properties)],
                zonage: Some(ZonagePanel::from_lookup(zonage)),
                external_link: Some(external_map_link(*lng_lat)),
            },
            Selection::Zone { properties, .. } => Self {
                title,
                subtitle,
                sections: zone_sections(properties),
                zonage: None,
                external_link: None,
            },
            Selection::LandUse { properties, .. } => Self {
                title,
                subtitle,
                sections: vec![land_use_section(properties)],
                zonage: None,
                external_link: None,
            },
        }
    }
}

/// Link opening the coordinate in an external web map.
pub fn external_map_link(at: LngLat) -> String {
    format!("https://www.google.com/maps/@{},{},18z", at.lat, at.lng)
}

fn rows_for(properties: &Properties, fields: &[(&'static str, &str)]) -> Vec<DetailRow> {
    fields
        .iter()
        .map(|(label, key)| DetailRow::new(*label, fmt_value(properties.get(*key))))
        .collect()
}

fn building_section(properties: &Properties) -> DetailSection {
    DetailSection {
        heading: "Building",
        rows: rows_for(
            properties,
            &[
                ("Address", "address"),
                ("Neighborhood", "neighborhood"),
                ("Type", "buildingType"),
                ("Year Built", "yearBuilt"),
                ("Floors", "floors"),
                ("Units", "numUnits"),
                ("Category", "category"),
                ("Land Area", "landArea"),
                ("Building Area", "buildingArea"),
            ],
        ),
    }
}

fn zone_sections(properties: &Properties) -> Vec<DetailSection> {
    let mut sections = vec![DetailSection {
        heading: "Location",
        rows: rows_for(
            properties,
            &[
                ("Arrondissement", "arrondissement"),
                ("District", "district"),
                ("Secteur", "secteur"),
            ],
        ),
    }];

    let classes: Vec<DetailRow> = (1..=6)
        .filter_map(|index| property_text(properties, &format!("classe{index}")))
        .filter(|class| !class.is_empty())
        .map(|class| DetailRow::new("Class", class))
        .collect();
    if !classes.is_empty() {
        sections.push(DetailSection {
            heading: "Classes",
            rows: classes,
        });
    }

    let range = |min: &str, max: &str| {
        fmt_range(&fmt_value(properties.get(min)), &fmt_value(properties.get(max)))
    };
    sections.push(DetailSection {
        heading: "Limits",
        rows: vec![
            DetailRow::new("Floors", range("etageMin", "etageMax")),
            DetailRow::new("Densité", range("densiteMin", "densiteMax")),
            DetailRow::new("Taux", range("tauxMin", "tauxMax")),
        ],
    });

    let notes: Vec<DetailRow> = [("Note", "note"), ("Info", "info")]
        .into_iter()
        .filter_map(|(label, key)| {
            property_text(properties, key)
                .filter(|text| !text.is_empty())
                .map(|text| DetailRow::new(label, text))
        })
        .collect();
    if !notes.is_empty() {
        sections.push(DetailSection {
            heading: "Notes",
            rows: notes,
        });
    }
    sections
}

fn land_use_section(properties: &Properties) -> DetailSection {
    let area = properties
        .get("areaSqm")
        .and_then(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|square_metres| square_metres.is_finite() && *square_metres != 0.0)
        .map_or_else(
            || MISSING.to_owned(),
            |square_metres| format!("{:.2} km²", square_metres / SQUARE_METRES_PER_KM2),
        );

    let mut rows = rows_for(
        properties,
        &[("Type (EN)", "affectationEn"), ("Type (FR)", "affectation")],
    );
    rows.push(DetailRow::new("Area", area));
    DetailSection {
        heading: "Land Use",
        rows,
    }
}

fn zonage_rows(zonage: &Zonage) -> Vec<DetailRow> {
    let mut rows = vec![
        DetailRow::new("Zone Code", fmt_text(zonage.zone_code.as_deref())),
        DetailRow::new("Arrondissement", fmt_text(zonage.arrondissement.as_deref())),
        DetailRow::new("District", fmt_text(zonage.district.as_deref())),
    ];
    if let Some(secteur) = zonage.secteur.as_deref().filter(|text| !text.is_empty()) {
        rows.push(DetailRow::new("Secteur", secteur));
    }
    let classes = zonage.classes();
    if !classes.is_empty() {
        rows.push(DetailRow::new("Classes", classes.join(", ")));
    }
    rows.extend([
        DetailRow::new(
            "Floors",
            fmt_range(&fmt_number(zonage.etage_min), &fmt_number(zonage.etage_max)),
        ),
        DetailRow::new(
            "Densité",
            fmt_range(&fmt_number(zonage.densite_min), &fmt_number(zonage.densite_max)),
        ),
        DetailRow::new(
            "Taux",
            fmt_range(&fmt_number(zonage.taux_min), &fmt_number(zonage.taux_max)),
        ),
    ]);
    for (label, text) in [("Note", &zonage.note), ("Info", &zonage.info)] {
        if let Some(present) = text.as_deref().filter(|text| !text.is_empty()) {
            rows.push(DetailRow::new(label, present));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    //! Panel assembly for each selection kind.

    use super::*;
    use crate::domain::geojson::Geometry;
    use rstest::rstest;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    fn building() -> Selection {
        Selection::Building {
            properties: props(json!({
                "address": "123 Rue Sainte-Catherine",
                "neighborhood": "Ville-Marie",
                "yearBuilt": 1925,
                "floors": null,
                "category": ""
            })),
            geometry: Geometry::Point([-73.567_312, 45.501_689]),
            lng_lat: LngLat::new(-73.567_312, 45.501_689),
        }
    }

    fn row<'a>(section: &'a DetailSection, label: &str) -> Option<&'a str> {
        section
            .rows
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }

    #[rstest]
    #[case::missing(None, "—")]
    #[case::null(Some(json!(null)), "—")]
    #[case::empty_text(Some(json!("")), "—")]
    #[case::integer(Some(json!(1925)), "1925")]
    #[case::decimal(Some(json!(2.5)), "2.5")]
    #[case::text(Some(json!("Duplex")), "Duplex")]
    fn formats_optional_values(#[case] value: Option<Value>, #[case] expected: &str) {
        assert_eq!(fmt_value(value.as_ref()), expected);
    }

    #[test]
    fn building_panel_has_rows_zonage_and_link() {
        let panel = DetailPanel::build(&building(), &ZonageLookup::Loading);

        assert_eq!(panel.title, "123 Rue Sainte-Catherine");
        assert_eq!(panel.subtitle.as_deref(), Some("Ville-Marie"));
        let section = &panel.sections[0];
        assert_eq!(row(section, "Year Built"), Some("1925"));
        assert_eq!(row(section, "Floors"), Some(MISSING));
        assert_eq!(row(section, "Category"), Some(MISSING));
        assert_eq!(panel.zonage, Some(ZonagePanel::Loading));
        assert_eq!(
            panel.external_link.as_deref(),
            Some("https://www.google.com/maps/@45.501689,-73.567312,18z")
        );
    }

    #[test]
    fn not_found_zonage_renders_empty_state() {
        let panel = DetailPanel::build(&building(), &ZonageLookup::Loaded(None));
        let zonage = panel.zonage.expect("building panels carry zonage");
        assert_eq!(zonage, ZonagePanel::Empty);
        assert_eq!(zonage.to_string(), "No zonage data available");
    }

    #[test]
    fn loaded_zonage_renders_ranges_and_optional_rows() {
        let zonage = Zonage {
            id: 4,
            zone_code: Some("R-12".to_owned()),
            classe1: Some("H.1".to_owned()),
            classe2: Some("H.2".to_owned()),
            etage_min: Some(2.0),
            etage_max: Some(3.5),
            note: Some("Voir plan".to_owned()),
            ..Zonage::default()
        };
        let panel = DetailPanel::build(&building(), &ZonageLookup::Loaded(Some(zonage)));
        let Some(ZonagePanel::Rows(rows)) = panel.zonage else {
            panic!("expected zonage rows");
        };
        let find = |label: &str| {
            rows.iter()
                .find(|row| row.label == label)
                .map(|row| row.value.clone())
        };
        assert_eq!(find("Zone Code").as_deref(), Some("R-12"));
        assert_eq!(find("District").as_deref(), Some(MISSING));
        assert_eq!(find("Classes").as_deref(), Some("H.1, H.2"));
        assert_eq!(find("Floors").as_deref(), Some("2 — 3.5"));
        assert_eq!(find("Taux").as_deref(), Some("— — —"));
        assert_eq!(find("Note").as_deref(), Some("Voir plan"));
        assert!(find("Secteur").is_none());
        assert!(find("Info").is_none());
    }

    #[test]
    fn failed_zonage_keeps_message() {
        let panel = DetailPanel::build(
            &building(),
            &ZonageLookup::Failed("Zonage fetch failed: 500".to_owned()),
        );
        assert_eq!(
            panel.zonage,
            Some(ZonagePanel::Failed {
                message: "Zonage fetch failed: 500".to_owned()
            })
        );
    }

    #[test]
    fn zone_panel_lists_classes_limits_and_notes() {
        let selection = Selection::Zone {
            properties: props(json!({
                "zoneCode": "C-4",
                "arrondissement": "Verdun",
                "classe1": "C.2",
                "classe4": "H.3",
                "etageMin": 1,
                "info": "Secteur patrimonial"
            })),
            geometry: Geometry::Polygon(Vec::new()),
        };
        let panel = DetailPanel::build(&selection, &ZonageLookup::Idle);

        let headings: Vec<&str> = panel.sections.iter().map(|section| section.heading).collect();
        assert_eq!(headings, vec!["Location", "Classes", "Limits", "Notes"]);
        assert_eq!(panel.sections[1].rows.len(), 2);
        assert_eq!(row(&panel.sections[2], "Floors"), Some("1 — —"));
        assert!(panel.zonage.is_none());
        assert!(panel.external_link.is_none());
    }

    #[rstest]
    #[case::numeric(json!({ "areaSqm": 1_234_567 }), "1.23 km²")]
    #[case::text(json!({ "areaSqm": "2500000" }), "2.50 km²")]
    #[case::missing(json!({}), "—")]
    #[case::garbage(json!({ "areaSqm": "n/a" }), "—")]
    fn land_use_area_renders_square_kilometres(#[case] properties: Value, #[case] expected: &str) {
        let selection = Selection::LandUse {
            properties: props(properties),
            geometry: Geometry::Polygon(Vec::new()),
        };
        let panel = DetailPanel::build(&selection, &ZonageLookup::Idle);
        assert_eq!(row(&panel.sections[0], "Area"), Some(expected));
    }
}
