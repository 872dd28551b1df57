//! Viewport-driven fetch and selection coordinator.
//!
//! The coordinator is the single place deciding what the map shows. It owns
//! the map handle, the view state, and the ordering discipline for
//! overlapping requests:
//!
//! - every viewport cycle takes a [`FetchEpoch`]; only the latest epoch may
//!   commit results,
//! - every zonage lookup takes a ticket; only the latest ticket may commit,
//! - the state mutex is never held across an await, and each epoch check
//!   happens under the same lock as the commit it guards.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{join, join_all, join3};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::ports::{ClickPoint, Cursor, FeatureSource, MapSurface};
use crate::domain::presentation::{
    self, ADMIN_SOURCE, BUILDINGS_SOURCE, HIGHLIGHT_SOURCE, LAND_USE_SOURCE, PresentationPlan,
    ZONES_SOURCE,
};
use crate::domain::{
    ArrondissementRef, DetailPanel, FeatureCollection, FeatureKind, FeatureQuery, FilterState,
    LngLat, LookupTicket, MapStyle, Selection, ViewportBounds, ZonageLookup, ZoneCodeSet,
    sort_by_official_name,
};

mod click;
mod epoch;
mod state;
mod status;

use click::{ClickHit, resolve_click};
pub use epoch::FetchEpoch;
use state::ViewState;
pub use status::{NO_BUILDINGS_HINT, StatusInputs, StatusLine, ZOOM_IN_HINT};

/// Padding, in pixels, kept around an area when fitting the camera to it.
pub const AREA_FIT_PADDING: u32 = 40;

/// Camera position restored when the area filter is cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialView {
    /// Map centre.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            center: LngLat::new(-73.5673, 45.5017),
            zoom: 12.0,
        }
    }
}

/// Coordinator behaviour knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportCoordinatorConfig {
    /// Minimum zoom at which buildings are fetched.
    pub buildings_min_zoom: f64,
    /// Fetch, draw, and hit-test the land-use layer.
    pub land_use_enabled: bool,
    /// Camera restored when the area filter is cleared.
    pub initial_view: InitialView,
    /// Base URL under which style documents live.
    pub style_base_url: String,
    /// Optional tile-provider key appended to style URLs.
    pub style_key: Option<String>,
    /// Base style applied when the map mounts.
    pub initial_style: MapStyle,
}

impl Default for ViewportCoordinatorConfig {
    fn default() -> Self {
        Self {
            buildings_min_zoom: 14.0,
            land_use_enabled: true,
            initial_view: InitialView::default(),
            style_base_url: "https://api.maptiler.com/maps/".to_owned(),
            style_key: None,
            initial_style: MapStyle::default(),
        }
    }
}

/// Port bundle required by the coordinator.
pub struct ViewportCoordinatorPorts {
    /// Remote data service.
    pub source: Arc<dyn FeatureSource>,
    /// Map renderer.
    pub map: Arc<dyn MapSurface>,
}

impl ViewportCoordinatorPorts {
    /// Build a strongly-typed port bundle.
    pub fn new(source: Arc<dyn FeatureSource>, map: Arc<dyn MapSurface>) -> Self {
        Self { source, map }
    }
}

/// How a fetch cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Results (or failures) were committed.
    Applied(FetchEpoch),
    /// A newer cycle was issued first; nothing but the loading flag changed.
    Superseded(FetchEpoch),
}

/// Errors returned by coordinator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// The map has not loaded yet or has been unmounted.
    #[error("map is not mounted")]
    NotMounted,
    /// No reference record matches the requested area code.
    #[error("unknown arrondissement: {code3l}")]
    UnknownArrondissement {
        /// Requested three-letter code.
        code3l: String,
    },
    /// The style URL could not be built from configuration.
    #[error("invalid style url: {message}")]
    InvalidStyleUrl {
        /// Parser message.
        message: String,
    },
}

/// Read-only copy of the view state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    /// A fetch cycle is in flight.
    pub loading: bool,
    /// Last fetch error.
    pub error: Option<String>,
    /// Filters in effect.
    pub filters: FilterState,
    /// Displayed buildings.
    pub buildings: FeatureCollection,
    /// Displayed zones.
    pub zones: FeatureCollection,
    /// Displayed land use.
    pub land_use: FeatureCollection,
    /// Displayed administrative boundaries.
    pub admin_boundaries: FeatureCollection,
    /// Highlight overlay.
    pub highlight: FeatureCollection,
    /// Zone codes of the selected area.
    pub zone_codes: ZoneCodeSet,
    /// Area reference records.
    pub arrondissement_refs: Vec<ArrondissementRef>,
    /// Area names from the zoning data set.
    pub arrondissement_names: Vec<String>,
    /// Current selection.
    pub selection: Option<Selection>,
    /// Zonage lookup state.
    pub zonage: ZonageLookup,
    /// Current base style.
    pub style: MapStyle,
}

/// Domain-owned coordinator for one mounted map.
pub struct ViewportCoordinator {
    source: Arc<dyn FeatureSource>,
    map: Arc<dyn MapSurface>,
    config: ViewportCoordinatorConfig,
    plan: PresentationPlan,
    state: Mutex<ViewState>,
}

impl ViewportCoordinator {
    /// Build a coordinator around an unloaded map.
    pub fn new(ports: ViewportCoordinatorPorts, config: ViewportCoordinatorConfig) -> Self {
        let plan = PresentationPlan::new(config.land_use_enabled);
        let state = ViewState {
            style: config.initial_style,
            ..ViewState::default()
        };
        Self {
            source: ports.source,
            map: ports.map,
            config,
            plan,
            state: Mutex::new(state),
        }
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &ViewportCoordinatorConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mounted_state(&self) -> Result<MutexGuard<'_, ViewState>, CoordinatorError> {
        let state = self.state();
        if state.mounted {
            Ok(state)
        } else {
            Err(CoordinatorError::NotMounted)
        }
    }

    /// Replace the listed map sources with what the state displays.
    ///
    /// Sources missing from the map (mid style swap) are skipped; the next
    /// installation publishes them.
    fn publish(&self, state: &ViewState, sources: &[&'static str]) {
        let displayed = state.displayed();
        for source in sources {
            if !self.map.has_source(source) {
                debug!(source, "map source absent, deferring publish");
                continue;
            }
            let data = match *source {
                BUILDINGS_SOURCE => displayed.buildings,
                ADMIN_SOURCE => displayed.admin_boundaries,
                ZONES_SOURCE => displayed.zones,
                LAND_USE_SOURCE => displayed.land_use,
                HIGHLIGHT_SOURCE => displayed.highlight,
                _ => continue,
            };
            if let Err(error) = self.map.set_source_data(source, data) {
                warn!(source, error = %error, "map source update failed");
            }
        }
    }

    fn install(&self, state: &ViewState) {
        if let Err(error) = presentation::install(self.map.as_ref(), &self.plan, &state.displayed())
        {
            warn!(error = %error, "presentation install failed");
        }
    }

    /// Mount: apply a non-default initial style, install presentation, load
    /// secondary data, run the first cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidStyleUrl`] when the initial style
    /// needs a URL and the configured base does not parse.
    pub async fn on_map_loaded(&self) -> Result<CycleOutcome, CoordinatorError> {
        let initial_style = self.config.initial_style;
        let style_url = if initial_style == MapStyle::default() {
            None
        } else {
            Some(self.style_url(initial_style)?)
        };
        {
            let mut state = self.state();
            state.mounted = true;
            if let Some(url) = style_url {
                info!(style = %initial_style, url = %url, "applying initial map style");
                self.map.set_style(url.as_str());
            }
            self.install(&state);
        }
        info!("map loaded");
        let ((), outcome) = join(self.load_secondary_data(), self.refresh_viewport()).await;
        outcome
    }

    async fn load_secondary_data(&self) {
        let (boundaries, refs, names) = join3(
            self.source.admin_boundaries(),
            self.source.arrondissement_refs(),
            self.source.arrondissement_names(),
        )
        .await;

        let mut state = self.state();
        if !state.mounted {
            return;
        }
        match boundaries {
            Ok(collection) => {
                debug!(count = collection.len(), "admin boundaries loaded");
                state.all_boundaries = collection;
                state.recompute_boundaries();
                self.publish(&state, &[ADMIN_SOURCE]);
            }
            Err(error) => warn!(error = %error, "failed to load admin boundaries"),
        }
        match refs {
            Ok(mut records) => {
                sort_by_official_name(&mut records);
                state.arrondissement_refs = records;
            }
            Err(error) => warn!(error = %error, "failed to load arrondissement refs"),
        }
        match names {
            Ok(list) => state.arrondissement_names = list,
            Err(error) => warn!(error = %error, "failed to load arrondissement names"),
        }
    }

    /// Run one viewport fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotMounted`] before load or after unmount.
    pub async fn refresh_viewport(&self) -> Result<CycleOutcome, CoordinatorError> {
        let camera = self.map.camera();
        let gated = camera.zoom < self.config.buildings_min_zoom;
        let (epoch, query) = {
            let mut state = self.mounted_state()?;
            let epoch = state.epochs.issue();
            state.loading = true;
            state.error = None;
            (
                epoch,
                FeatureQuery::new(camera.bounds.rounded(), state.filters.clone()),
            )
        };

        let kinds = self.viewport_kinds(gated);
        debug!(
            epoch = epoch.value(),
            zoom = camera.zoom,
            buildings_gated = gated,
            kinds = ?kinds,
            "viewport fetch issued"
        );
        let results = join_all(
            kinds
                .iter()
                .map(|kind| self.source.fetch_features(*kind, &query)),
        )
        .await;

        let mut state = self.state();
        if !state.epochs.is_current(epoch) {
            if results.iter().any(Result::is_err) {
                state.loading = false;
            }
            debug!(epoch = epoch.value(), "viewport fetch superseded");
            return Ok(CycleOutcome::Superseded(epoch));
        }

        if gated {
            state.buildings = FeatureCollection::empty();
        }
        let mut first_error = None;
        for (kind, result) in kinds.iter().zip(results) {
            let collection = match result {
                Ok(collection) => collection,
                Err(error) => {
                    warn!(
                        epoch = epoch.value(),
                        kind = kind.label(),
                        error = %error,
                        "viewport fetch failed"
                    );
                    first_error.get_or_insert_with(|| error.to_string());
                    FeatureCollection::empty()
                }
            };
            match kind {
                FeatureKind::Buildings => state.buildings = collection,
                FeatureKind::Zones => state.fetched_zones = collection,
                FeatureKind::LandUse => state.land_use = collection,
            }
        }
        state.error = first_error;
        state.loading = false;
        state.recompute_zones();
        self.publish(&state, &[BUILDINGS_SOURCE, ZONES_SOURCE, LAND_USE_SOURCE]);
        info!(
            epoch = epoch.value(),
            buildings = state.buildings.len(),
            zones = state.zones.len(),
            land_use = state.land_use.len(),
            failed = state.error.is_some(),
            "viewport fetch applied"
        );
        Ok(CycleOutcome::Applied(epoch))
    }

    fn viewport_kinds(&self, buildings_gated: bool) -> Vec<FeatureKind> {
        let mut kinds = Vec::with_capacity(3);
        if !buildings_gated {
            kinds.push(FeatureKind::Buildings);
        }
        kinds.push(FeatureKind::Zones);
        if self.config.land_use_enabled {
            kinds.push(FeatureKind::LandUse);
        }
        kinds
    }

    /// Replace the attribute filters and re-run the cycle.
    ///
    /// The selected area and zone code are kept; they change only through
    /// [`Self::select_arrondissement`] and [`Self::select_zone_code`].
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotMounted`] before load or after unmount.
    pub async fn set_filters(
        &self,
        filters: FilterState,
    ) -> Result<CycleOutcome, CoordinatorError> {
        {
            let mut state = self.mounted_state()?;
            let area = state.filters.area.take();
            let zone_code = state.filters.zone_code.take();
            state.filters = FilterState {
                area,
                zone_code,
                ..filters
            };
        }
        self.refresh_viewport().await
    }

    /// Select an administrative area by three-letter code, or clear it.
    ///
    /// Selecting loads the area's zone codes, fits the camera to its
    /// boundary, and re-runs the cycle. Clearing flies back to the initial
    /// view and re-runs the cycle.
    ///
    /// # Errors
    ///
    /// Fails when unmounted or when `code3l` names no known area.
    pub async fn select_arrondissement(
        &self,
        code3l: Option<&str>,
    ) -> Result<CycleOutcome, CoordinatorError> {
        let Some(code) = code3l else {
            self.clear_arrondissement()?;
            return self.refresh_viewport().await;
        };

        let generation = self.begin_area_selection(code)?;
        let ((), outcome) = join(
            self.load_zone_codes(code, generation),
            self.refresh_viewport(),
        )
        .await;
        outcome
    }

    fn clear_arrondissement(&self) -> Result<(), CoordinatorError> {
        let mut state = self.mounted_state()?;
        state.filters.area = None;
        state.filters.zone_code = None;
        state.zone_codes = ZoneCodeSet::Loaded(BTreeSet::new());
        state.zone_code_generation += 1;
        state.recompute_zones();
        state.recompute_boundaries();
        self.publish(&state, &[ZONES_SOURCE, ADMIN_SOURCE]);
        let initial = self.config.initial_view;
        self.map.fly_to(initial.center, initial.zoom);
        info!("arrondissement cleared");
        Ok(())
    }

    fn begin_area_selection(&self, code3l: &str) -> Result<u64, CoordinatorError> {
        let mut state = self.mounted_state()?;
        let area = state
            .find_area(code3l)
            .ok_or_else(|| CoordinatorError::UnknownArrondissement {
                code3l: code3l.to_owned(),
            })?;
        state.filters.area = Some(area);
        state.filters.zone_code = None;
        state.zone_codes = ZoneCodeSet::Loading;
        state.zone_code_generation += 1;
        let generation = state.zone_code_generation;
        state.recompute_zones();
        state.recompute_boundaries();
        self.publish(&state, &[ZONES_SOURCE, ADMIN_SOURCE]);

        let bounds = state
            .boundaries
            .features
            .first()
            .and_then(|feature| feature.geometry.as_ref())
            .and_then(ViewportBounds::enclosing);
        if let Some(fit) = bounds {
            self.map.fit_bounds(fit, AREA_FIT_PADDING);
        }
        info!(code3l, generation, "arrondissement selected");
        Ok(generation)
    }

    async fn load_zone_codes(&self, code3l: &str, generation: u64) {
        let result = self.source.zone_codes(code3l).await;
        let mut state = self.state();
        if !state.zone_codes_current(generation, code3l) {
            debug!(code3l, generation, "zone codes superseded");
            return;
        }
        state.zone_codes = match result {
            Ok(codes) => {
                debug!(code3l, count = codes.len(), "zone codes loaded");
                codes.into_iter().collect()
            }
            Err(error) => {
                warn!(code3l, error = %error, "failed to load zone codes");
                ZoneCodeSet::Loaded(BTreeSet::new())
            }
        };
        state.recompute_zones();
        self.publish(&state, &[ZONES_SOURCE]);
    }

    /// Narrow displayed zones to one code, or widen back to the area.
    ///
    /// This only recomputes the displayed subset; nothing is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotMounted`] before load or after unmount.
    pub fn select_zone_code(&self, zone_code: Option<String>) -> Result<(), CoordinatorError> {
        let mut state = self.mounted_state()?;
        state.filters.zone_code = zone_code.filter(|code| !code.is_empty());
        state.recompute_zones();
        self.publish(&state, &[ZONES_SOURCE]);
        Ok(())
    }

    /// Resolve a click into a selection and, for buildings, look up zoning.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotMounted`] before load or after unmount.
    pub async fn handle_click(&self, point: ClickPoint) -> Result<(), CoordinatorError> {
        if let Some(ticket) = self.apply_click(&point)? {
            self.resolve_zonage(ticket).await;
        }
        Ok(())
    }

    fn apply_click(&self, point: &ClickPoint) -> Result<Option<LookupTicket>, CoordinatorError> {
        let mut state = self.mounted_state()?;
        match resolve_click(self.map.as_ref(), point, self.config.land_use_enabled) {
            ClickHit::Selected(selection) => {
                state.highlight = FeatureCollection::highlight(selection.geometry());
                let ticket = match selection.lng_lat() {
                    Some(at) => Some(state.zonage.begin(at)),
                    None => {
                        state.zonage.reset();
                        None
                    }
                };
                debug!(title = %selection.title(), "feature selected");
                state.selection = Some(selection);
                self.publish(&state, &[HIGHLIGHT_SOURCE]);
                Ok(ticket)
            }
            ClickHit::Nothing => {
                Self::clear_selection(&mut state);
                self.publish(&state, &[HIGHLIGHT_SOURCE]);
                Ok(None)
            }
            ClickHit::Unresolved => Ok(None),
        }
    }

    fn clear_selection(state: &mut ViewState) {
        state.selection = None;
        state.zonage.reset();
        state.highlight = FeatureCollection::empty();
    }

    async fn resolve_zonage(&self, ticket: LookupTicket) {
        let result = self
            .source
            .zonage_at_point(ticket.at())
            .await
            .map_err(|error| error.to_string());
        let mut state = self.state();
        if state.zonage.complete(&ticket, result) {
            debug!(lng = ticket.at().lng, lat = ticket.at().lat, "zonage lookup committed");
        } else {
            debug!(lng = ticket.at().lng, lat = ticket.at().lat, "zonage lookup abandoned");
        }
    }

    /// Close the detail panel and clear the highlight.
    pub fn close_details(&self) {
        let mut state = self.state();
        Self::clear_selection(&mut state);
        self.publish(&state, &[HIGHLIGHT_SOURCE]);
    }

    /// Keyboard shortcut handling; `Escape` closes the detail panel.
    pub fn handle_key(&self, key: &str) {
        if key == "Escape" {
            self.close_details();
        }
    }

    /// Restart the zonage lookup for the selected building.
    ///
    /// Returns `false` when no building is selected.
    pub async fn retry_zonage(&self) -> bool {
        let ticket = {
            let mut state = self.state();
            let Some(at) = state.selection.as_ref().and_then(Selection::lng_lat) else {
                return false;
            };
            state.zonage.reset();
            state.zonage.begin(at)
        };
        self.resolve_zonage(ticket).await;
        true
    }

    /// Pointer entered `layer`.
    pub fn pointer_entered(&self, layer: &str) {
        if let Some(rule) = presentation::hover_rule(layer) {
            self.map.set_cursor(Cursor::Pointer);
            if let Err(error) =
                self.map
                    .set_paint_property(rule.layer, rule.property, json!(rule.hover))
            {
                debug!(layer, error = %error, "hover paint skipped");
            }
        }
    }

    /// Pointer left `layer`.
    pub fn pointer_left(&self, layer: &str) {
        if let Some(rule) = presentation::hover_rule(layer) {
            self.map.set_cursor(Cursor::Default);
            if let Err(error) =
                self.map
                    .set_paint_property(rule.layer, rule.property, json!(rule.rest))
            {
                debug!(layer, error = %error, "hover paint skipped");
            }
        }
    }

    /// Swap the base style. Layers come back on [`Self::on_style_loaded`].
    ///
    /// # Errors
    ///
    /// Fails when unmounted or when the configured style base URL is invalid.
    pub fn change_style(&self, style: MapStyle) -> Result<(), CoordinatorError> {
        let url = self.style_url(style)?;
        let mut state = self.mounted_state()?;
        state.style = style;
        info!(style = %style, url = %url, "changing map style");
        self.map.set_style(url.as_str());
        Ok(())
    }

    /// Style URL for `style` under the configured base.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidStyleUrl`] for a malformed base.
    pub fn style_url(&self, style: MapStyle) -> Result<Url, CoordinatorError> {
        let invalid = |error: url::ParseError| CoordinatorError::InvalidStyleUrl {
            message: error.to_string(),
        };
        let base = Url::parse(&self.config.style_base_url).map_err(invalid)?;
        style
            .style_url(&base, self.config.style_key.as_deref())
            .map_err(invalid)
    }

    /// Re-establish every source and layer after a style swap, using the
    /// data currently held in state.
    pub fn on_style_loaded(&self) {
        let state = self.state();
        if !state.mounted {
            return;
        }
        self.install(&state);
        debug!(style = %state.style, "style reloaded");
    }

    /// Tear down the map and abandon all in-flight work.
    pub fn unmount(&self) {
        let mut state = self.state();
        if !state.mounted {
            return;
        }
        state.mounted = false;
        state.epochs.invalidate();
        state.zonage.reset();
        state.zone_code_generation += 1;
        self.map.teardown();
        info!("map unmounted");
    }

    /// Copy of the current view state.
    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state();
        ViewSnapshot {
            loading: state.loading,
            error: state.error.clone(),
            filters: state.filters.clone(),
            buildings: state.buildings.clone(),
            zones: state.zones.clone(),
            land_use: state.land_use.clone(),
            admin_boundaries: state.boundaries.clone(),
            highlight: state.highlight.clone(),
            zone_codes: state.zone_codes.clone(),
            arrondissement_refs: state.arrondissement_refs.clone(),
            arrondissement_names: state.arrondissement_names.clone(),
            selection: state.selection.clone(),
            zonage: state.zonage.state().clone(),
            style: state.style,
        }
    }

    /// Status line for the current state and camera.
    pub fn status_line(&self) -> StatusLine {
        let zoom = self.map.camera().zoom;
        let state = self.state();
        StatusLine::new(StatusInputs {
            loading: state.loading,
            buildings: state.buildings.len(),
            zones: state.zones.len(),
            zoom,
            buildings_min_zoom: self.config.buildings_min_zoom,
            error: state.error.as_deref(),
        })
    }

    /// Detail panel for the current selection.
    pub fn detail_panel(&self) -> Option<DetailPanel> {
        let state = self.state();
        state
            .selection
            .as_ref()
            .map(|selection| DetailPanel::build(selection, state.zonage.state()))
    }
}
