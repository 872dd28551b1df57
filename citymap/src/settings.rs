//! Viewer configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{InitialView, LngLat, MapStyle, UnknownMapStyle, ViewportCoordinatorConfig};
use crate::inbound::DEFAULT_MOVE_DEBOUNCE;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Errors raised while turning settings into runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A URL setting does not parse.
    #[error("{setting} is not a valid URL: {message}")]
    InvalidUrl {
        /// Setting name.
        setting: &'static str,
        /// Parser message.
        message: String,
    },
    /// The base style name is unknown.
    #[error(transparent)]
    UnknownStyle(#[from] UnknownMapStyle),
    /// A numeric setting is out of range.
    #[error("{setting} is out of range: {value}")]
    OutOfRange {
        /// Setting name.
        setting: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Configuration values for the map viewer.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CITYMAP")]
pub struct ViewerSettings {
    /// Base URL of the municipal data service.
    pub api_base_url: Option<String>,
    /// Minimum zoom at which buildings are fetched.
    pub buildings_min_zoom: Option<f64>,
    /// Quiet period after a camera move before fetching, in milliseconds.
    pub move_debounce_ms: Option<u64>,
    /// Initial camera longitude.
    pub initial_lng: Option<f64>,
    /// Initial camera latitude.
    pub initial_lat: Option<f64>,
    /// Initial camera zoom.
    pub initial_zoom: Option<f64>,
    /// Base style name: `positron`, `hybrid`, or `streets`.
    pub style: Option<String>,
    /// Base URL under which style documents live.
    pub style_base_url: Option<String>,
    /// Tile-provider key appended to style URLs.
    pub style_key: Option<String>,
    /// Fetch and draw the land-use layer; on when unset.
    pub land_use_enabled: Option<bool>,
}

impl ViewerSettings {
    /// Data service base URL, falling back to a local backend.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        let raw = self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL);
        Url::parse(raw).map_err(|error| SettingsError::InvalidUrl {
            setting: "api_base_url",
            message: error.to_string(),
        })
    }

    /// Move-end debounce, falling back to 400 ms.
    pub fn move_debounce(&self) -> Duration {
        self.move_debounce_ms
            .map_or(DEFAULT_MOVE_DEBOUNCE, Duration::from_millis)
    }

    /// Configured base style, falling back to positron.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownStyle`] for unrecognised names.
    pub fn style(&self) -> Result<MapStyle, SettingsError> {
        self.style
            .as_deref()
            .map_or(Ok(MapStyle::default()), str::parse)
            .map_err(SettingsError::from)
    }

    /// Coordinator configuration derived from these settings.
    ///
    /// # Errors
    ///
    /// Fails when the zoom threshold is negative or not finite, when the
    /// style name is unknown, or when the style base URL does not parse.
    pub fn coordinator_config(&self) -> Result<ViewportCoordinatorConfig, SettingsError> {
        let defaults = ViewportCoordinatorConfig::default();
        let buildings_min_zoom = self
            .buildings_min_zoom
            .unwrap_or(defaults.buildings_min_zoom);
        if !buildings_min_zoom.is_finite() || buildings_min_zoom < 0.0 {
            return Err(SettingsError::OutOfRange {
                setting: "buildings_min_zoom",
                value: buildings_min_zoom.to_string(),
            });
        }

        let style_base_url = self
            .style_base_url
            .clone()
            .unwrap_or(defaults.style_base_url);
        Url::parse(&style_base_url).map_err(|error| SettingsError::InvalidUrl {
            setting: "style_base_url",
            message: error.to_string(),
        })?;

        let initial = defaults.initial_view;
        Ok(ViewportCoordinatorConfig {
            buildings_min_zoom,
            land_use_enabled: self.land_use_enabled.unwrap_or(defaults.land_use_enabled),
            initial_view: InitialView {
                center: LngLat::new(
                    self.initial_lng.unwrap_or(initial.center.lng),
                    self.initial_lat.unwrap_or(initial.center.lat),
                ),
                zoom: self.initial_zoom.unwrap_or(initial.zoom),
            },
            style_base_url,
            style_key: self.style_key.clone().filter(|key| !key.trim().is_empty()),
            initial_style: self.style()?,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for viewer configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 10] = [
        "CITYMAP_API_BASE_URL",
        "CITYMAP_BUILDINGS_MIN_ZOOM",
        "CITYMAP_MOVE_DEBOUNCE_MS",
        "CITYMAP_INITIAL_LNG",
        "CITYMAP_INITIAL_LAT",
        "CITYMAP_INITIAL_ZOOM",
        "CITYMAP_STYLE",
        "CITYMAP_STYLE_BASE_URL",
        "CITYMAP_STYLE_KEY",
        "CITYMAP_LAND_USE_ENABLED",
    ];

    fn load_from_empty_args() -> ViewerSettings {
        ViewerSettings::load_from_iter([OsString::from("citymap")]).expect("config should load")
    }

    fn with_overrides(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(with_overrides(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_base_url().expect("default url").as_str(),
            "http://localhost:8080/"
        );
        assert_eq!(settings.move_debounce(), Duration::from_millis(400));
        assert_eq!(settings.style(), Ok(MapStyle::Positron));
        assert_eq!(
            settings.coordinator_config(),
            Ok(ViewportCoordinatorConfig::default())
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(with_overrides(&[
            ("CITYMAP_API_BASE_URL", "https://data.example/map"),
            ("CITYMAP_BUILDINGS_MIN_ZOOM", "15"),
            ("CITYMAP_MOVE_DEBOUNCE_MS", "250"),
            ("CITYMAP_STYLE", "hybrid"),
            ("CITYMAP_STYLE_KEY", "secret"),
            ("CITYMAP_LAND_USE_ENABLED", "false"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_base_url().expect("url").as_str(),
            "https://data.example/map"
        );
        assert_eq!(settings.move_debounce(), Duration::from_millis(250));
        assert_eq!(settings.style(), Ok(MapStyle::Hybrid));

        let config = settings.coordinator_config().expect("config");
        assert!((config.buildings_min_zoom - 15.0).abs() < f64::EPSILON);
        assert!(!config.land_use_enabled);
        assert_eq!(config.style_key.as_deref(), Some("secret"));
        assert_eq!(config.initial_style, MapStyle::Hybrid);
    }

    #[rstest]
    fn land_use_is_enabled_without_environment() {
        let _guard = lock_env(with_overrides(&[]));

        let settings = load_from_empty_args();
        assert_eq!(settings.land_use_enabled, None);
        let config = settings.coordinator_config().expect("config");
        assert!(config.land_use_enabled);
        assert_eq!(config.initial_style, MapStyle::Positron);
    }

    #[rstest]
    #[case::enabled("true", true)]
    #[case::disabled("false", false)]
    fn land_use_follows_the_environment(#[case] raw: &str, #[case] expected: bool) {
        let _guard = lock_env(with_overrides(&[("CITYMAP_LAND_USE_ENABLED", raw)]));

        let config = load_from_empty_args()
            .coordinator_config()
            .expect("config");
        assert_eq!(config.land_use_enabled, expected);
    }

    #[rstest]
    fn rejects_unknown_style_names() {
        let _guard = lock_env(with_overrides(&[("CITYMAP_STYLE", "satellite")]));

        let settings = load_from_empty_args();
        assert!(matches!(settings.style(), Err(SettingsError::UnknownStyle(_))));
        assert!(matches!(
            settings.coordinator_config(),
            Err(SettingsError::UnknownStyle(_))
        ));
    }
}
