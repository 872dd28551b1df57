//! Map event loop.
//!
//! Translates renderer and UI events into coordinator calls. Camera
//! move-end events are debounced so a burst of pans produces one fetch
//! cycle; every fetch-producing call runs on its own task so cycles overlap
//! and the coordinator's epochs decide which one lands.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::domain::ports::ClickPoint;
use crate::domain::{CoordinatorError, CycleOutcome, FilterState, MapStyle, ViewportCoordinator};

/// Quiet period after the last move-end before a fetch cycle starts.
pub const DEFAULT_MOVE_DEBOUNCE: Duration = Duration::from_millis(400);

/// Events delivered by the renderer and the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The map finished its first load.
    Loaded,
    /// The camera stopped moving.
    MoveEnd,
    /// A new base style finished loading.
    StyleLoaded,
    /// The user clicked the canvas.
    Click(ClickPoint),
    /// The pointer entered an interactive layer.
    PointerEntered(String),
    /// The pointer left an interactive layer.
    PointerLeft(String),
    /// A key was pressed.
    Key(String),
    /// Attribute filters changed.
    Filters(FilterState),
    /// An administrative area was picked, or the pick was cleared.
    SelectArrondissement(Option<String>),
    /// A zone code was picked, or the pick was cleared.
    SelectZoneCode(Option<String>),
    /// A base style was picked.
    ChangeStyle(MapStyle),
    /// The detail panel's close button was pressed.
    CloseDetails,
    /// The zonage retry button was pressed.
    RetryZonage,
    /// The view is going away.
    Unmount,
}

/// Trailing-edge debounce deadline.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Debouncer firing `quiet` after the last [`Debouncer::bump`].
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Record an event at `now`, pushing the deadline back.
    pub fn bump(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Pending deadline, if any.
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Clear the deadline once it has fired.
    pub const fn clear(&mut self) {
        self.deadline = None;
    }
}

/// Drives one coordinator from a stream of [`MapEvent`]s.
pub struct MapEventLoop {
    coordinator: Arc<ViewportCoordinator>,
    debouncer: Debouncer,
    tasks: JoinSet<()>,
}

impl MapEventLoop {
    /// Event loop with the given move-end quiet period.
    pub fn new(coordinator: Arc<ViewportCoordinator>, move_debounce: Duration) -> Self {
        Self {
            coordinator,
            debouncer: Debouncer::new(move_debounce),
            tasks: JoinSet::new(),
        }
    }

    /// Consume events until [`MapEvent::Unmount`] or the sender closes, then
    /// wait for in-flight work to settle.
    ///
    /// A closed channel still runs a pending move-end cycle once its quiet
    /// period elapses; [`MapEvent::Unmount`] drops it.
    pub async fn run(mut self, mut events: mpsc::Receiver<MapEvent>) {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                () = wait_for(deadline) => self.fire_move_end(),
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("event channel closed");
                        break;
                    };
                    if !self.dispatch(event) {
                        break;
                    }
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(error) = joined {
                        warn!(error = %error, "coordinator task failed");
                    }
                }
            }
        }

        if let Some(deadline) = self.debouncer.deadline() {
            sleep_until(deadline).await;
            self.fire_move_end();
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(error) = joined {
                warn!(error = %error, "coordinator task failed");
            }
        }
        info!("map event loop stopped");
    }

    /// Handle one event; returns `false` when the loop should stop.
    fn dispatch(&mut self, event: MapEvent) -> bool {
        match event {
            MapEvent::Loaded => self.spawn_cycle("load", |coordinator| async move {
                coordinator.on_map_loaded().await
            }),
            MapEvent::MoveEnd => self.debouncer.bump(Instant::now()),
            MapEvent::StyleLoaded => self.coordinator.on_style_loaded(),
            MapEvent::Click(point) => {
                let coordinator = Arc::clone(&self.coordinator);
                self.tasks.spawn(async move {
                    if let Err(error) = coordinator.handle_click(point).await {
                        warn!(error = %error, "click ignored");
                    }
                });
            }
            MapEvent::PointerEntered(layer) => self.coordinator.pointer_entered(&layer),
            MapEvent::PointerLeft(layer) => self.coordinator.pointer_left(&layer),
            MapEvent::Key(key) => self.coordinator.handle_key(&key),
            MapEvent::Filters(filters) => self.spawn_cycle("filters", |coordinator| async move {
                coordinator.set_filters(filters).await
            }),
            MapEvent::SelectArrondissement(code3l) => {
                self.spawn_cycle("arrondissement", |coordinator| async move {
                    coordinator.select_arrondissement(code3l.as_deref()).await
                });
            }
            MapEvent::SelectZoneCode(code) => {
                if let Err(error) = self.coordinator.select_zone_code(code) {
                    warn!(error = %error, "zone code selection ignored");
                }
            }
            MapEvent::ChangeStyle(style) => {
                if let Err(error) = self.coordinator.change_style(style) {
                    warn!(error = %error, "style change ignored");
                }
            }
            MapEvent::CloseDetails => self.coordinator.close_details(),
            MapEvent::RetryZonage => {
                let coordinator = Arc::clone(&self.coordinator);
                self.tasks.spawn(async move {
                    if !coordinator.retry_zonage().await {
                        debug!("zonage retry without a building selection");
                    }
                });
            }
            MapEvent::Unmount => {
                self.debouncer.clear();
                self.coordinator.unmount();
                return false;
            }
        }
        true
    }

    fn fire_move_end(&mut self) {
        self.debouncer.clear();
        debug!("move-end quiet period elapsed");
        self.spawn_cycle("viewport", |coordinator| async move {
            coordinator.refresh_viewport().await
        });
    }

    fn spawn_cycle<F, Fut>(&mut self, trigger: &'static str, cycle: F)
    where
        F: FnOnce(Arc<ViewportCoordinator>) -> Fut,
        Fut: Future<Output = Result<CycleOutcome, CoordinatorError>> + Send + 'static,
    {
        let task = cycle(Arc::clone(&self.coordinator));
        self.tasks.spawn(async move {
            match task.await {
                Ok(outcome) => debug!(trigger, ?outcome, "fetch cycle finished"),
                Err(error) => warn!(trigger, error = %error, "fetch cycle rejected"),
            }
        });
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
