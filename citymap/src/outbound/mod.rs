//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest-backed `FeatureSource` for the municipal data service
//! - **headless**: in-memory `MapSurface` with geometric hit-testing, used by
//!   the command-line viewer and the integration suites
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod headless;
pub mod http;
