//! Monotonic identifiers for viewport fetch cycles.

/// Identifies one issued viewport fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchEpoch(u64);

impl FetchEpoch {
    /// Raw counter value, for logs.
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Issues epochs and remembers the latest one.
///
/// A result may be committed only while its epoch is still the latest.
#[derive(Debug, Default)]
pub(crate) struct EpochCounter {
    latest: u64,
}

impl EpochCounter {
    pub(crate) fn issue(&mut self) -> FetchEpoch {
        self.latest += 1;
        FetchEpoch(self.latest)
    }

    pub(crate) const fn is_current(&self, epoch: FetchEpoch) -> bool {
        epoch.0 == self.latest
    }

    /// Supersede every issued epoch without starting a new cycle.
    pub(crate) fn invalidate(&mut self) {
        self.latest += 1;
    }
}
