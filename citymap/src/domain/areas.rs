//! Administrative areas (arrondissements) and their zone-code sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Reference record for one administrative area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrondissementRef {
    /// Database identifier.
    pub id: i64,
    /// Official display name.
    pub nom_officiel: String,
    /// Short name.
    #[serde(default)]
    pub nom_abrege: Option<String>,
    /// Acronym.
    #[serde(default)]
    pub acronyme: Option<String>,
    /// Three-letter code; joins zone codes and boundary features.
    pub code3l: String,
    /// Administrative unit identifier.
    #[serde(default)]
    pub id_uadm: Option<i64>,
    /// Electoral number.
    #[serde(default)]
    pub no_arro_election: Option<i64>,
    /// Code sent as the `borough` query parameter.
    #[serde(default)]
    pub code_rem: Option<String>,
}

/// Sort references by official name for display.
pub fn sort_by_official_name(refs: &mut [ArrondissementRef]) {
    refs.sort_by(|a, b| a.nom_officiel.cmp(&b.nom_officiel));
}

/// Feature property holding an administrative boundary's three-letter code.
pub const BOUNDARY_CODE_PROPERTY: &str = "code_3c";

/// Zone codes belonging to the selected administrative area.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ZoneCodeSet {
    /// The set has been requested but has not arrived.
    #[default]
    Loading,
    /// The set is known.
    Loaded(BTreeSet<String>),
}

impl ZoneCodeSet {
    /// Whether `code` belongs to a loaded set; always `false` while loading.
    pub fn admits(&self, code: &str) -> bool {
        match self {
            Self::Loading => false,
            Self::Loaded(codes) => codes.contains(code),
        }
    }

    /// Codes available for the zone-code picker, sorted.
    pub fn codes(&self) -> Vec<&str> {
        match self {
            Self::Loading => Vec::new(),
            Self::Loaded(codes) => codes.iter().map(String::as_str).collect(),
        }
    }
}

impl FromIterator<String> for ZoneCodeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::Loaded(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    //! Reference decoding and zone-code admission.

    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_reference_records() {
        let refs: Vec<ArrondissementRef> = serde_json::from_value(json!([
            {
                "id": 3,
                "nomOfficiel": "Verdun",
                "nomAbrege": "Verdun",
                "acronyme": "VER",
                "code3l": "VER",
                "idUadm": 19,
                "noArroElection": 17,
                "codeRem": "VD"
            },
            {
                "id": 1,
                "nomOfficiel": "Ahuntsic-Cartierville",
                "code3l": "AHU"
            }
        ]))
        .expect("references should decode");

        let mut sorted = refs;
        sort_by_official_name(&mut sorted);
        assert_eq!(sorted[0].code3l, "AHU");
        assert_eq!(sorted[1].code_rem.as_deref(), Some("VD"));
    }

    #[test]
    fn loading_set_admits_nothing() {
        assert!(!ZoneCodeSet::Loading.admits("R-1"));
        assert!(ZoneCodeSet::Loading.codes().is_empty());

        let loaded: ZoneCodeSet = ["R-1".to_owned(), "C-2".to_owned()].into_iter().collect();
        assert!(loaded.admits("R-1"));
        assert!(!loaded.admits("I-9"));
        assert_eq!(loaded.codes(), vec!["C-2", "R-1"]);
    }
}
