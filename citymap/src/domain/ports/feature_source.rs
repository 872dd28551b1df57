//! Driven port for the remote municipal data service.
//!
//! The domain owns the query shape and the response contract; adapters own
//! URLs, headers, and decoding.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{
    ArrondissementRef, FeatureCollection, FeatureKind, FeatureQuery, LngLat, Zonage,
};

define_port_error! {
    /// Errors surfaced while calling the data service.
    pub enum FeatureSourceError {
        /// The service answered with a non-success status.
        Network { endpoint: String, status: u16 } =>
            "{endpoint} request failed with status {status}",
        /// The request never produced a response.
        Transport { endpoint: String, message: String } =>
            "{endpoint} transport failed: {message}",
        /// The response body did not match the expected shape.
        Decode { endpoint: String, message: String } =>
            "{endpoint} response decode failed: {message}",
        /// The adapter rejected the request before sending it.
        InvalidRequest { message: String } =>
            "request invalid: {message}",
    }
}

impl FeatureSourceError {
    /// HTTP status, when the service produced one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } | Self::InvalidRequest { .. } => None,
        }
    }
}

/// Port for reading features, zoning, and reference data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetch one feature kind inside the query's bounds.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use citymap::domain::ports::{FeatureSource, FixtureFeatureSource};
    /// use citymap::domain::{FeatureKind, FeatureQuery, FilterState, ViewportBounds};
    ///
    /// let source = FixtureFeatureSource;
    /// let query = FeatureQuery::new(
    ///     ViewportBounds::new(-73.6, 45.5, -73.5, 45.6),
    ///     FilterState::default(),
    /// );
    /// let zones = source.fetch_features(FeatureKind::Zones, &query).await?;
    /// assert!(zones.is_empty());
    /// # Ok::<(), citymap::domain::ports::FeatureSourceError>(())
    /// ```
    async fn fetch_features(
        &self,
        kind: FeatureKind,
        query: &FeatureQuery,
    ) -> Result<FeatureCollection, FeatureSourceError>;

    /// Zoning record covering `at`; `Ok(None)` when no zoning applies.
    async fn zonage_at_point(&self, at: LngLat) -> Result<Option<Zonage>, FeatureSourceError>;

    /// Zone codes used inside the area identified by `code3l`.
    async fn zone_codes(&self, code3l: &str) -> Result<Vec<String>, FeatureSourceError>;

    /// Area names known to the zoning data set.
    async fn arrondissement_names(&self) -> Result<Vec<String>, FeatureSourceError>;

    /// Area reference records.
    async fn arrondissement_refs(&self) -> Result<Vec<ArrondissementRef>, FeatureSourceError>;

    /// Every administrative boundary.
    async fn admin_boundaries(&self) -> Result<FeatureCollection, FeatureSourceError>;
}

/// Fixture implementation returning empty data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureFeatureSource;

#[async_trait]
impl FeatureSource for FixtureFeatureSource {
    async fn fetch_features(
        &self,
        _kind: FeatureKind,
        _query: &FeatureQuery,
    ) -> Result<FeatureCollection, FeatureSourceError> {
        Ok(FeatureCollection::empty())
    }

    async fn zonage_at_point(&self, _at: LngLat) -> Result<Option<Zonage>, FeatureSourceError> {
        Ok(None)
    }

    async fn zone_codes(&self, _code3l: &str) -> Result<Vec<String>, FeatureSourceError> {
        Ok(Vec::new())
    }

    async fn arrondissement_names(&self) -> Result<Vec<String>, FeatureSourceError> {
        Ok(Vec::new())
    }

    async fn arrondissement_refs(&self) -> Result<Vec<ArrondissementRef>, FeatureSourceError> {
        Ok(Vec::new())
    }

    async fn admin_boundaries(&self) -> Result<FeatureCollection, FeatureSourceError> {
        Ok(FeatureCollection::empty())
    }
}
