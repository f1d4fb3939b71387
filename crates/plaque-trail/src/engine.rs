//! The engine facade consumed by the view layer
//!
//! `PlaqueEngine` wires the pure core (filtering, search merge, routing,
//! cluster previews) to the runtime pieces (persisted view state, debounced
//! search session, walking directions, map handle). The view layer calls into
//! it and renders whatever it returns; it never touches the collaborators
//! directly.

use crate::geolocation::{self, GeolocationError, Position, PositionProvider};
use crate::map_surface::{Layer, MapSlot, MapSurface, SurfaceError};
use crate::providers::{DirectionsProvider, PlaceSearchProvider};
use crate::search_session::{DEFAULT_SEARCH_DEBOUNCE, SearchOutcome, SearchSession};
use crate::storage::StorageBackend;
use crate::view_store::{DEFAULT_PERSIST_DEBOUNCE, MapViewStore};
use crate::walking::WalkingRouteAdapter;
use plaque_trail_lib::{
    Cluster, ClusterPresenter, Coordinate, EngineConfig, EngineError, MapViewState, Marker,
    MarkerId, RouteEngine, RouteNotice, RouteStats, SearchResult, WalkingRoute, clamp_radius,
    cluster_markers,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Grid size, in screen pixels, under which markers collapse into a cluster
pub const DEFAULT_CLUSTER_CELL_PX: f64 = 60.0;

/// Timing and mode knobs that sit outside [`EngineConfig`]
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub search_debounce: Duration,
    pub persist_debounce: Duration,
    pub locate_timeout: Duration,
    pub walking_mode: bool,
    pub cluster_cell_px: f64,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            persist_debounce: DEFAULT_PERSIST_DEBOUNCE,
            locate_timeout: geolocation::DEFAULT_LOCATE_TIMEOUT,
            walking_mode: false,
            cluster_cell_px: DEFAULT_CLUSTER_CELL_PX,
        }
    }
}

pub struct PlaqueEngine<P, D> {
    config: EngineConfig,
    options: RuntimeOptions,
    markers: Vec<Marker>,
    index: HashMap<MarkerId, usize>,
    store: MapViewStore,
    search: SearchSession<P>,
    walking: WalkingRouteAdapter<D>,
    route: RouteEngine,
    presenter: ClusterPresenter,
    map: MapSlot,
}

impl<P: PlaceSearchProvider, D: DirectionsProvider> PlaqueEngine<P, D> {
    /// Build the engine and restore persisted view state and recent selections
    pub fn new(
        config: EngineConfig,
        options: RuntimeOptions,
        markers: Vec<Marker>,
        storage: Arc<dyn StorageBackend>,
        places: P,
        directions: D,
    ) -> Self {
        let mut index = HashMap::with_capacity(markers.len());
        for (position, marker) in markers.iter().enumerate() {
            if index.insert(marker.id, position).is_some() {
                tracing::warn!("Duplicate marker id {}, keeping the last record", marker.id);
            }
        }
        let located = markers.iter().filter(|m| m.has_coordinate()).count();
        tracing::info!(
            "Engine ready with {} markers ({} located)",
            markers.len(),
            located
        );

        Self {
            store: MapViewStore::restore(storage.clone(), options.persist_debounce),
            search: SearchSession::new(&config, places, storage, options.search_debounce),
            walking: WalkingRouteAdapter::new(
                directions,
                config.minutes_per_km,
                options.walking_mode,
            ),
            route: RouteEngine::with_pace(config.minutes_per_km),
            presenter: ClusterPresenter::new(config.preview.clone()),
            map: MapSlot::default(),
            config,
            options,
            markers,
            index,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.index.get(&id).map(|&position| &self.markers[position])
    }

    pub fn view(&self) -> MapViewState {
        self.store.snapshot()
    }

    pub fn view_store(&self) -> &MapViewStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Distance filter & viewport
    // ------------------------------------------------------------------

    /// Markers passing the current distance filter, in dataset order
    pub fn visible_markers(&self) -> Vec<&Marker> {
        self.store.distance_filter().apply(&self.markers)
    }

    /// Visible markers grouped for the given zoom
    pub fn clusters(&self, zoom: u8) -> Vec<Cluster<'_>> {
        cluster_markers(self.visible_markers(), zoom, self.options.cluster_cell_px)
    }

    pub fn presenter(&self) -> &ClusterPresenter {
        &self.presenter
    }

    /// Center the radius filter and the map on a resolved location
    pub fn apply_location(&self, location: Coordinate) -> Result<(), EngineError> {
        self.store.set_search_location(location)?;
        self.store.update_distance_filter(|filter| {
            let radius = filter.radius_km();
            filter.set(location, radius, true)
        })?;
        self.store.set_center(location)
    }

    /// Set the filter radius, clamped to the supported range; returns the radius used
    pub fn set_radius(&self, radius_km: f64) -> f64 {
        let radius = clamp_radius(radius_km);
        if let Err(e) = self
            .store
            .update_distance_filter(|filter| filter.update_radius(radius))
        {
            tracing::warn!("Radius not applied: {}", e);
        }
        radius
    }

    pub fn clear_distance_filter(&self) {
        self.store.clear_distance_filter();
    }

    /// Forget the resolved location along with its filter
    pub fn clear_location(&self) {
        self.store.clear_distance_filter();
        self.store.clear_search_location();
    }

    /// Move-end callback from the map surface
    pub fn on_move_end(&self, center: Coordinate, zoom: u8) -> Result<(), EngineError> {
        self.store.set_view(center, zoom)
    }

    /// Resolve the device position and filter around it
    pub async fn locate<L: PositionProvider>(
        &self,
        provider: &L,
    ) -> Result<Position, GeolocationError> {
        let position = geolocation::locate(provider, self.options.locate_timeout).await?;
        self.apply_location(position.coordinate)
            .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;
        Ok(position)
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub async fn search(&self, text: &str) -> SearchOutcome {
        self.search.search(&self.markers, text).await
    }

    pub fn recent_selections(&self) -> Vec<SearchResult> {
        self.search.recent()
    }

    pub fn clear_recent_selections(&self) {
        self.search.clear_recent();
    }

    /// Act on a picked result and remember it
    ///
    /// Locations become the filter center, plaques recenter the map,
    /// categories only go to the recent list.
    pub fn select_result(&self, result: &SearchResult) {
        let applied = match result {
            SearchResult::Location(place) => self.apply_location(place.coordinate),
            SearchResult::Plaque(marker) => match marker.coordinate() {
                Some(position) => self.store.set_center(position),
                None => Ok(()),
            },
            SearchResult::Category { .. } => Ok(()),
        };
        if let Err(e) = applied {
            tracing::warn!("Ignoring selection {:?}: {}", result.label(), e);
        }
        self.search.record_selection(result.clone());
    }

    // ------------------------------------------------------------------
    // Route
    // ------------------------------------------------------------------

    pub fn route(&self) -> &RouteEngine {
        &self.route
    }

    pub fn add_to_route(&mut self, id: MarkerId) -> Result<(), RouteNotice> {
        let marker = self
            .marker(id)
            .cloned()
            .ok_or(RouteNotice::UnknownMarker { id })?;
        self.route.add(marker)
    }

    pub fn remove_from_route(&mut self, id: MarkerId) -> bool {
        self.route.remove(id).is_some()
    }

    /// Replace the route with the markers named by `ids`, in that order
    ///
    /// Returns ids dropped as duplicates.
    pub fn reorder_route(&mut self, ids: &[MarkerId]) -> Result<Vec<MarkerId>, RouteNotice> {
        let sequence = ids
            .iter()
            .map(|&id| self.marker(id).cloned().ok_or(RouteNotice::UnknownMarker { id }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.route.reorder(sequence))
    }

    pub fn move_route_point(&mut self, from: usize, to: usize) -> Result<(), RouteNotice> {
        self.route.move_point(from, to)
    }

    pub fn optimize_route(&mut self) -> Result<(), RouteNotice> {
        self.route.optimize()
    }

    /// Leave route mode
    pub fn clear_route(&mut self) {
        self.route.clear();
        self.walking.cancel();
        if let Some(handle) = self.map.handle_mut() {
            handle.clear_layer(Layer::Routes);
        }
    }

    pub fn route_stats(&self) -> RouteStats {
        self.route.stats()
    }

    pub fn walking_mode(&self) -> bool {
        self.walking.walking_mode()
    }

    pub fn set_walking_mode(&self, enabled: bool) {
        self.walking.set_walking_mode(enabled);
    }

    /// Compute leg geometry for the current route and draw it
    ///
    /// `None` when a newer computation superseded this one.
    pub async fn walking_route(&mut self) -> Option<WalkingRoute> {
        let route = self.walking.compute(self.route.points()).await?;
        if let Some(handle) = self.map.handle_mut() {
            handle.show_route(&route);
        }
        Some(route)
    }

    // ------------------------------------------------------------------
    // Map surface
    // ------------------------------------------------------------------

    pub fn attach_map(&mut self, surface: Box<dyn MapSurface>) -> Result<(), SurfaceError> {
        self.map.attach(surface)?;
        self.refresh_map();
        Ok(())
    }

    /// Redraw clusters and the filter circle from the current view state
    pub fn refresh_map(&mut self) {
        let view = self.store.snapshot();
        let Some(handle) = self.map.handle_mut() else {
            return;
        };
        let visible = view.distance_filter.apply(&self.markers);
        let clusters = cluster_markers(visible, view.zoom, self.options.cluster_cell_px);
        handle.show_clusters(&clusters, &self.presenter);
        handle.show_distance_filter(&view.distance_filter);
    }

    /// Remove all overlays and release the surface (view unmount)
    pub fn detach_map(&mut self) -> bool {
        self.map.detach().is_some()
    }

    /// Write view state now instead of waiting for the debounce
    pub fn persist(&self) {
        if let Err(e) = self.store.persist() {
            tracing::warn!("Failed to persist map view state: {}", e);
        }
    }
}
