//! Reqwest-backed data service adapter.
//!
//! This adapter owns transport details only: URL building, cache headers,
//! HTTP error mapping, and JSON decoding into domain records.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::FeatureCollectionDto;
use crate::domain::ports::{FeatureSource, FeatureSourceError};
use crate::domain::{
    ArrondissementRef, FeatureCollection, FeatureKind, FeatureQuery, LngLat, Zonage,
};

/// One service endpoint: a short name for messages and its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoint {
    name: &'static str,
    path: &'static str,
}

const BUILDINGS: Endpoint = Endpoint {
    name: "buildings",
    path: "api/buildings/search/geojsonsearch-polygons",
};
const ZONES: Endpoint = Endpoint {
    name: "zones",
    path: "api/zonage/search/geojson",
};
const LAND_USE: Endpoint = Endpoint {
    name: "land use",
    path: "api/land-use/search/geojson",
};
const ZONAGE_AT_POINT: Endpoint = Endpoint {
    name: "zonage",
    path: "api/zonage/at-point",
};
const ZONE_CODES: Endpoint = Endpoint {
    name: "zone codes",
    path: "api/zonage/zone-codes",
};
const ARRONDISSEMENT_NAMES: Endpoint = Endpoint {
    name: "arrondissement names",
    path: "api/zonage/arrondissements",
};
const ARRONDISSEMENT_REFS: Endpoint = Endpoint {
    name: "arrondissements",
    path: "api/arrondissements",
};
const ADMIN_BOUNDARIES: Endpoint = Endpoint {
    name: "admin boundaries",
    path: "api/admin-boundaries/all/geojson",
};

const fn feature_endpoint(kind: FeatureKind) -> Endpoint {
    match kind {
        FeatureKind::Buildings => BUILDINGS,
        FeatureKind::Zones => ZONES,
        FeatureKind::LandUse => LAND_USE,
    }
}

/// Data service adapter issuing HTTP GET requests under one base URL.
///
/// Requests carry `Cache-Control: no-store` and `Pragma: no-cache`. No
/// client-side timeout is configured; superseded requests are abandoned by
/// the coordinator, not aborted.
pub struct HttpFeatureSource {
    client: Client,
    base: Url,
}

impl HttpFeatureSource {
    /// Build an adapter rooted at `base`.
    ///
    /// A base with a path prefix keeps it: `http://host/map` resolves
    /// endpoints under `http://host/map/api/...`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
        })
    }

    /// Base URL every endpoint is resolved against.
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url, FeatureSourceError> {
        self.base.join(endpoint.path).map_err(|error| {
            FeatureSourceError::invalid_request(format!("{}: {error}", endpoint.name))
        })
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<Response, FeatureSourceError> {
        let url = self.url(endpoint)?;
        debug!(endpoint = endpoint.name, %url, params = query.len(), "data service request");
        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| map_transport_error(endpoint, &error))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<T, FeatureSourceError> {
        let response = self.send(endpoint, query).await?;
        decode_success(endpoint, response).await
    }

    async fn get_collection(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<FeatureCollection, FeatureSourceError> {
        let decoded: FeatureCollectionDto = self.get_json(endpoint, query).await?;
        decoded
            .into_domain()
            .map_err(|message| FeatureSourceError::decode(endpoint.name, message))
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn fetch_features(
        &self,
        kind: FeatureKind,
        query: &FeatureQuery,
    ) -> Result<FeatureCollection, FeatureSourceError> {
        self.get_collection(feature_endpoint(kind), &query.query_pairs(kind))
            .await
    }

    async fn zonage_at_point(&self, at: LngLat) -> Result<Option<Zonage>, FeatureSourceError> {
        let response = self
            .send(
                ZONAGE_AT_POINT,
                &[("lng", at.lng.to_string()), ("lat", at.lat.to_string())],
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(lng = at.lng, lat = at.lat, "no zonage at point");
            return Ok(None);
        }
        decode_success(ZONAGE_AT_POINT, response).await.map(Some)
    }

    async fn zone_codes(&self, code3l: &str) -> Result<Vec<String>, FeatureSourceError> {
        self.get_json(ZONE_CODES, &[("code3l", code3l.to_owned())])
            .await
    }

    async fn arrondissement_names(&self) -> Result<Vec<String>, FeatureSourceError> {
        self.get_json(ARRONDISSEMENT_NAMES, &[]).await
    }

    async fn arrondissement_refs(&self) -> Result<Vec<ArrondissementRef>, FeatureSourceError> {
        self.get_json(ARRONDISSEMENT_REFS, &[]).await
    }

    async fn admin_boundaries(&self) -> Result<FeatureCollection, FeatureSourceError> {
        self.get_collection(ADMIN_BOUNDARIES, &[]).await
    }
}

async fn decode_success<T: DeserializeOwned>(
    endpoint: Endpoint,
    response: Response,
) -> Result<T, FeatureSourceError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|error| map_transport_error(endpoint, &error))?;
    if !status.is_success() {
        return Err(map_status_error(endpoint, status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref()).map_err(|error| {
        FeatureSourceError::decode(endpoint.name, format!("invalid JSON payload: {error}"))
    })
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn map_transport_error(endpoint: Endpoint, error: &reqwest::Error) -> FeatureSourceError {
    FeatureSourceError::transport(endpoint.name, error.to_string())
}

fn map_status_error(endpoint: Endpoint, status: StatusCode, body: &[u8]) -> FeatureSourceError {
    let preview = body_preview(body);
    debug!(
        endpoint = endpoint.name,
        status = status.as_u16(),
        body = %preview,
        "data service returned an error status"
    );
    FeatureSourceError::network(endpoint.name, status.as_u16())
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
