//! Zoning records and the per-selection lookup state machine.
//!
//! A lookup is keyed by the building selection that started it. Every new
//! selection, retry, or close issues a fresh [`LookupTicket`]; a response is
//! committed only while its ticket is still the current one.

use serde::{Deserialize, Serialize};

use super::bounds::LngLat;

/// Zoning regulation record returned by the point lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zonage {
    /// Database identifier.
    pub id: i64,
    /// Zone code, e.g. `R-1`.
    #[serde(default)]
    pub zone_code: Option<String>,
    /// Administrative area name.
    #[serde(default)]
    pub arrondissement: Option<String>,
    /// District label.
    #[serde(default)]
    pub district: Option<String>,
    /// Sector label.
    #[serde(default)]
    pub secteur: Option<String>,
    /// First permitted use class.
    #[serde(default)]
    pub classe1: Option<String>,
    /// Second permitted use class.
    #[serde(default)]
    pub classe2: Option<String>,
    /// Third permitted use class.
    #[serde(default)]
    pub classe3: Option<String>,
    /// Fourth permitted use class.
    #[serde(default)]
    pub classe4: Option<String>,
    /// Fifth permitted use class.
    #[serde(default)]
    pub classe5: Option<String>,
    /// Sixth permitted use class.
    #[serde(default)]
    pub classe6: Option<String>,
    /// Minimum floors.
    #[serde(default)]
    pub etage_min: Option<f64>,
    /// Maximum floors.
    #[serde(default)]
    pub etage_max: Option<f64>,
    /// Minimum density.
    #[serde(default)]
    pub densite_min: Option<f64>,
    /// Maximum density.
    #[serde(default)]
    pub densite_max: Option<f64>,
    /// Minimum lot coverage.
    #[serde(default)]
    pub taux_min: Option<f64>,
    /// Maximum lot coverage.
    #[serde(default)]
    pub taux_max: Option<f64>,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
    /// Free-form information.
    #[serde(default)]
    pub info: Option<String>,
}

impl Zonage {
    /// Non-empty use classes in order.
    pub fn classes(&self) -> Vec<&str> {
        [
            &self.classe1,
            &self.classe2,
            &self.classe3,
            &self.classe4,
            &self.classe5,
            &self.classe6,
        ]
        .into_iter()
        .filter_map(|class| class.as_deref())
        .filter(|class| !class.is_empty())
        .collect()
    }
}

/// State of the zoning lookup for the current building selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ZonageLookup {
    /// No building is selected.
    #[default]
    Idle,
    /// A lookup is in flight.
    Loading,
    /// The lookup finished; `None` means no zoning covers the point.
    Loaded(Option<Zonage>),
    /// The lookup failed with a displayable message.
    Failed(String),
}

/// Identifies one issued lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupTicket {
    generation: u64,
    at: LngLat,
}

impl LookupTicket {
    /// Coordinate the lookup resolves.
    pub const fn at(&self) -> LngLat {
        self.at
    }
}

/// Owns the lookup state and the ticket discipline guarding it.
#[derive(Debug, Default)]
pub struct ZonageTracker {
    generation: u64,
    state: ZonageLookup,
}

impl ZonageTracker {
    /// Current lookup state.
    pub const fn state(&self) -> &ZonageLookup {
        &self.state
    }

    /// Start a lookup for `at`, superseding any lookup in flight.
    pub fn begin(&mut self, at: LngLat) -> LookupTicket {
        self.generation += 1;
        self.state = ZonageLookup::Loading;
        LookupTicket {
            generation: self.generation,
            at,
        }
    }

    /// Abandon any lookup in flight and return to idle.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = ZonageLookup::Idle;
    }

    /// Whether `ticket` still identifies the latest lookup.
    pub const fn is_current(&self, ticket: &LookupTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Commit a lookup result; returns `false` and changes nothing when the
    /// ticket has been superseded.
    pub fn complete(
        &mut self,
        ticket: &LookupTicket,
        result: Result<Option<Zonage>, String>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = match result {
            Ok(found) => ZonageLookup::Loaded(found),
            Err(message) => ZonageLookup::Failed(message),
        };
        true
    }
}
