//! Command-line map viewer.
//!
//! Loads one viewport from the data service into a headless map, optionally
//! replays pans through the debounced event loop, applies an area filter and
//! a click, then prints the status line and the detail panel.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use citymap::domain::ports::{Camera, ClickPoint};
use citymap::domain::{
    DetailPanel, LngLat, ViewportBounds, ViewportCoordinator, ViewportCoordinatorPorts,
};
use citymap::inbound::{MapEvent, MapEventLoop};
use citymap::outbound::headless::HeadlessMap;
use citymap::outbound::http::HttpFeatureSource;
use citymap::settings::ViewerSettings;
use clap::Parser;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `citymap` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "citymap",
    about = "Load one map viewport of buildings, zones, and land use",
    version
)]
struct CliArgs {
    /// Viewport as `min_lng,min_lat,max_lng,max_lat`.
    #[arg(
        long = "bounds",
        value_name = "min_lng,min_lat,max_lng,max_lat",
        value_parser = parse_bounds,
        allow_hyphen_values = true
    )]
    bounds: ViewportBounds,
    /// Camera zoom level.
    #[arg(long = "zoom", default_value_t = 15.0)]
    zoom: f64,
    /// Administrative area three-letter code to filter by.
    #[arg(long = "arrondissement", value_name = "code3l")]
    arrondissement: Option<String>,
    /// Click position as `lng,lat`.
    #[arg(
        long = "click",
        value_name = "lng,lat",
        value_parser = parse_lng_lat,
        allow_hyphen_values = true
    )]
    click: Option<LngLat>,
    /// Drag the view to centre on `lng,lat`; repeat for a burst of pans.
    #[arg(
        long = "pan",
        value_name = "lng,lat",
        value_parser = parse_lng_lat,
        allow_hyphen_values = true
    )]
    pans: Vec<LngLat>,
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = ViewerSettings::load_from_iter([std::ffi::OsString::from("citymap")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let config = settings
        .coordinator_config()
        .map_err(|error| io::Error::other(format!("invalid settings: {error}")))?;
    let base = settings.api_base_url().map_err(io::Error::other)?;
    let source = HttpFeatureSource::new(base)
        .map_err(|error| io::Error::other(format!("create HTTP client: {error}")))?;

    let bounds = args.bounds;
    let map = Arc::new(HeadlessMap::new(Camera {
        center: LngLat::new(
            f64::midpoint(bounds.min_lng, bounds.max_lng),
            f64::midpoint(bounds.min_lat, bounds.max_lat),
        ),
        zoom: args.zoom,
        bounds,
    }));
    let coordinator = Arc::new(ViewportCoordinator::new(
        ViewportCoordinatorPorts::new(Arc::new(source), map.clone()),
        config,
    ));

    let outcome = coordinator
        .on_map_loaded()
        .await
        .map_err(|error| io::Error::other(format!("initial load: {error}")))?;
    info!(?outcome, "initial viewport loaded");

    if !args.pans.is_empty() {
        replay_pans(&coordinator, &map, &args.pans, settings.move_debounce()).await?;
    }

    if let Some(code3l) = args.arrondissement.as_deref() {
        coordinator
            .select_arrondissement(Some(code3l))
            .await
            .map_err(|error| io::Error::other(format!("select arrondissement: {error}")))?;
    }
    if let Some(at) = args.click {
        coordinator
            .handle_click(ClickPoint::at(at))
            .await
            .map_err(|error| io::Error::other(format!("click: {error}")))?;
    }

    let mut out = io::stdout().lock();
    writeln!(out, "{}", coordinator.status_line())?;
    if let Some(panel) = coordinator.detail_panel() {
        write_panel(&mut out, &panel)?;
    }
    coordinator.unmount();
    Ok(())
}

/// Feed `pans` to a debounced event loop as move-end events and wait for the
/// resulting cycle.
async fn replay_pans(
    coordinator: &Arc<ViewportCoordinator>,
    map: &HeadlessMap,
    pans: &[LngLat],
    move_debounce: Duration,
) -> io::Result<()> {
    let (events, receiver) = mpsc::channel(pans.len());
    let running = tokio::spawn(
        MapEventLoop::new(Arc::clone(coordinator), move_debounce).run(receiver),
    );
    for &center in pans {
        map.pan_to(center);
        events
            .send(MapEvent::MoveEnd)
            .await
            .map_err(|error| io::Error::other(format!("event loop stopped: {error}")))?;
    }
    drop(events);
    running
        .await
        .map_err(|error| io::Error::other(format!("event loop failed: {error}")))?;
    info!(pans = pans.len(), ?move_debounce, "pans replayed");
    Ok(())
}

fn write_panel(out: &mut impl Write, panel: &DetailPanel) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", panel.title)?;
    if let Some(subtitle) = &panel.subtitle {
        writeln!(out, "{subtitle}")?;
    }
    for section in &panel.sections {
        writeln!(out, "[{}]", section.heading)?;
        for row in &section.rows {
            writeln!(out, "  {}: {}", row.label, row.value)?;
        }
    }
    if let Some(zonage) = &panel.zonage {
        writeln!(out, "[Zonage]")?;
        writeln!(out, "  {zonage}")?;
    }
    if let Some(link) = &panel.external_link {
        writeln!(out, "{link}")?;
    }
    Ok(())
}

fn parse_numbers<const N: usize>(raw: &str, what: &str) -> Result<[f64; N], String> {
    let values = raw
        .split(',')
        .map(str::trim)
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| format!("failed to parse {what} value: {error}"))?;
    values
        .try_into()
        .map_err(|_| format!("{what} must contain exactly {N} comma-separated numeric values"))
}

fn parse_bounds(raw: &str) -> Result<ViewportBounds, String> {
    let [min_lng, min_lat, max_lng, max_lat] = parse_numbers::<4>(raw, "bounds")?;
    if min_lng >= max_lng || min_lat >= max_lat {
        return Err("bounds must be [min_lng, min_lat, max_lng, max_lat]".to_owned());
    }
    Ok(ViewportBounds::new(min_lng, min_lat, max_lng, max_lat))
}

fn parse_lng_lat(raw: &str) -> Result<LngLat, String> {
    let [lng, lat] = parse_numbers::<2>(raw, "click")?;
    Ok(LngLat::new(lng, lat))
}
