//! One-line status summary shown under the filters.

use std::fmt;

/// Rendered status: summary, optional hint, optional error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// `Loading…` or the feature counts.
    pub summary: String,
    /// Explains an empty buildings layer.
    pub hint: Option<&'static str>,
    /// Last fetch error.
    pub error: Option<String>,
}

/// Inputs to [`StatusLine::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInputs<'a> {
    /// A fetch cycle is in flight.
    pub loading: bool,
    /// Displayed buildings.
    pub buildings: usize,
    /// Displayed zones.
    pub zones: usize,
    /// Current camera zoom.
    pub zoom: f64,
    /// Minimum zoom at which buildings are fetched.
    pub buildings_min_zoom: f64,
    /// Last fetch error.
    pub error: Option<&'a str>,
}

/// Hint shown when buildings are hidden by the zoom gate.
pub const ZOOM_IN_HINT: &str = "Zoom in to see buildings";
/// Hint shown when the viewport simply has no buildings.
pub const NO_BUILDINGS_HINT: &str = "No buildings in current view";

impl StatusLine {
    /// Derive the status line.
    pub fn new(inputs: StatusInputs<'_>) -> Self {
        let summary = if inputs.loading {
            "Loading…".to_owned()
        } else {
            format!("Buildings: {} | Zones: {}", inputs.buildings, inputs.zones)
        };
        let hint = (inputs.buildings == 0 && !inputs.loading).then(|| {
            if inputs.zoom < inputs.buildings_min_zoom {
                ZOOM_IN_HINT
            } else {
                NO_BUILDINGS_HINT
            }
        });
        Self {
            summary,
            hint,
            error: inputs.error.map(str::to_owned),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)?;
        if let Some(hint) = self.hint {
            write!(f, "\n{hint}")?;
        }
        if let Some(error) = &self.error {
            write!(f, "\nError: {error}")?;
        }
        Ok(())
    }
}
