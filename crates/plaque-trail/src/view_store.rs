//! Process-wide map view state with debounced persistence
//!
//! `MapViewStore` is the only writer of the [`MapViewState`]; everything else
//! works on snapshots. Each mutation schedules a write that fires once the
//! store has been quiet for the debounce window, so a continuous pan or zoom
//! ends up as a single write.

use crate::debounce::EpochCounter;
use crate::storage::{
    MAP_VIEW_STATE_KEY, StorageBackend, StorageResult, load_json_backend, save_json_backend,
};
use plaque_trail_lib::{Coordinate, DistanceFilter, EngineError, MAX_ZOOM, MIN_ZOOM, MapViewState};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub const DEFAULT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

struct Shared {
    state: RwLock<MapViewState>,
    backend: Arc<dyn StorageBackend>,
    writes: EpochCounter,
}

impl Shared {
    fn snapshot(&self) -> MapViewState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self) -> StorageResult<()> {
        save_json_backend(self.backend.as_ref(), MAP_VIEW_STATE_KEY, &self.snapshot())
    }

    /// Writes are fire-and-forget: failures are logged, never surfaced
    fn write_logged(&self) {
        match self.write() {
            Ok(()) => tracing::debug!("Persisted map view state"),
            Err(e) => tracing::warn!("Failed to persist map view state: {}", e),
        }
    }
}

/// Owner of the single [`MapViewState`]
#[derive(Clone)]
pub struct MapViewStore {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl MapViewStore {
    /// Fresh default state; nothing is read from storage
    pub fn new(backend: Arc<dyn StorageBackend>, debounce: Duration) -> Self {
        Self::with_state(backend, debounce, MapViewState::default())
    }

    /// Load the stored state, falling back to defaults when it is missing or unreadable
    pub fn restore(backend: Arc<dyn StorageBackend>, debounce: Duration) -> Self {
        let state = match load_json_backend::<MapViewState>(backend.as_ref(), MAP_VIEW_STATE_KEY) {
            Ok(Some(state)) => {
                let state = state.sanitized();
                tracing::info!(
                    "Restored map view at {} (zoom {})",
                    state.center,
                    state.zoom
                );
                state
            }
            Ok(None) => {
                tracing::debug!("No stored map view state, using defaults");
                MapViewState::default()
            }
            Err(e) => {
                tracing::warn!("Discarding stored map view state: {}", e);
                MapViewState::default()
            }
        };
        Self::with_state(backend, debounce, state)
    }

    fn with_state(backend: Arc<dyn StorageBackend>, debounce: Duration, state: MapViewState) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                backend,
                writes: EpochCounter::new(),
            }),
            debounce,
        }
    }

    pub fn snapshot(&self) -> MapViewState {
        self.shared.snapshot()
    }

    pub fn distance_filter(&self) -> DistanceFilter {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .distance_filter
            .clone()
    }

    pub fn set_center(&self, center: Coordinate) -> Result<(), EngineError> {
        let center = validated(center)?;
        self.mutate(|state| state.center = center);
        Ok(())
    }

    /// Zoom is clamped to the supported range
    pub fn set_zoom(&self, zoom: u8) {
        self.mutate(|state| state.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM));
    }

    /// Move-end callback from the map surface: center and zoom together, one write
    pub fn set_view(&self, center: Coordinate, zoom: u8) -> Result<(), EngineError> {
        let center = validated(center)?;
        self.mutate(|state| {
            state.center = center;
            state.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        });
        Ok(())
    }

    pub fn set_distance_filter(&self, filter: DistanceFilter) {
        self.mutate(|state| state.distance_filter = filter);
    }

    /// Edit the filter in place
    ///
    /// A write is scheduled only if the edit left the filter different, so a
    /// rejected radius or center costs nothing.
    pub fn update_distance_filter<R>(&self, edit: impl FnOnce(&mut DistanceFilter) -> R) -> R {
        let (result, changed) = {
            let mut state = self
                .shared
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let before = state.distance_filter.clone();
            let result = edit(&mut state.distance_filter);
            (result, state.distance_filter != before)
        };
        if changed {
            self.schedule_write();
        }
        result
    }

    pub fn clear_distance_filter(&self) {
        self.mutate(|state| state.distance_filter.clear());
    }

    pub fn set_search_location(&self, location: Coordinate) -> Result<(), EngineError> {
        let location = validated(location)?;
        self.mutate(|state| state.search_location = Some(location));
        Ok(())
    }

    pub fn clear_search_location(&self) {
        self.mutate(|state| state.search_location = None);
    }

    /// Replace the whole state with defaults
    pub fn reset(&self) {
        self.mutate(|state| *state = MapViewState::default());
    }

    /// Write the current state now, superseding any pending debounced write
    pub fn persist(&self) -> StorageResult<()> {
        self.shared.writes.advance();
        self.shared.write()
    }

    fn mutate<R>(&self, edit: impl FnOnce(&mut MapViewState) -> R) -> R {
        let result = {
            let mut state = self
                .shared
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            edit(&mut state)
        };
        self.schedule_write();
        result
    }

    fn schedule_write(&self) {
        let epoch = self.shared.writes.advance();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(&self.shared);
                let delay = self.debounce;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if shared.writes.is_current(epoch) {
                        shared.write_logged();
                    }
                });
            }
            // Outside a runtime there is nothing to debounce on; write through
            Err(_) => self.shared.write_logged(),
        }
    }
}

fn validated(coordinate: Coordinate) -> Result<Coordinate, EngineError> {
    Coordinate::new(coordinate.lat, coordinate.lon)
}
