//! Explicit handle to the map-rendering surface
//!
//! The surface itself (tiles, drawing) belongs to the host. The engine owns a
//! [`MapHandle`] that remembers every overlay it added, per layer, so a layer
//! can be redrawn wholesale and teardown can remove everything before the
//! surface is released.

use geo::{LineString, Point};
use plaque_trail_lib::{Cluster, ClusterPresenter, DistanceFilter, WalkingRoute};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub type OverlayId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Clusters,
    Circles,
    Routes,
}

impl Layer {
    /// Teardown order
    pub const ALL: [Layer; 3] = [Layer::Clusters, Layer::Circles, Layer::Routes];
}

/// Something drawn on the map; coordinates are lon/lat points
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Marker {
        position: Point<f64>,
        color: String,
        title: String,
    },
    Cluster {
        position: Point<f64>,
        icon_px: u32,
        class_name: &'static str,
        count: usize,
        preview: Vec<String>,
    },
    Circle {
        center: Point<f64>,
        radius_m: f64,
    },
    Polyline {
        line: LineString<f64>,
        /// Estimated legs are drawn dashed
        dashed: bool,
    },
}

/// Drawing primitives the host provides
pub trait MapSurface: Send {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId;
    fn remove_overlay(&mut self, id: OverlayId);
    /// Free the surface; no overlay calls follow
    fn release(&mut self);
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Map surface was already initialized")]
    AlreadyAttached,
}

pub struct MapHandle {
    surface: Box<dyn MapSurface>,
    layers: HashMap<Layer, Vec<OverlayId>>,
}

impl MapHandle {
    fn new(surface: Box<dyn MapSurface>) -> Self {
        Self {
            surface,
            layers: HashMap::new(),
        }
    }

    /// Remove a layer's overlays and draw `overlays` in their place
    pub fn replace_layer(&mut self, layer: Layer, overlays: impl IntoIterator<Item = Overlay>) {
        self.clear_layer(layer);
        let ids: Vec<OverlayId> = overlays
            .into_iter()
            .map(|overlay| self.surface.add_overlay(overlay))
            .collect();
        self.layers.insert(layer, ids);
    }

    pub fn clear_layer(&mut self, layer: Layer) {
        for id in self.layers.remove(&layer).unwrap_or_default() {
            self.surface.remove_overlay(id);
        }
    }

    pub fn overlay_count(&self, layer: Layer) -> usize {
        self.layers.get(&layer).map_or(0, Vec::len)
    }

    /// Single markers for lone members, cluster icons with previews otherwise
    pub fn show_clusters(&mut self, clusters: &[Cluster<'_>], presenter: &ClusterPresenter) {
        #[cfg(feature = "profiling")]
        profiling::scope!("map_surface::show_clusters");

        let overlays: Vec<Overlay> = clusters
            .iter()
            .filter_map(|cluster| match cluster.members.as_slice() {
                [] => None,
                [marker] => Some(Overlay::Marker {
                    position: cluster.center.to_point(),
                    color: marker.color.clone(),
                    title: marker.title.clone(),
                }),
                members => {
                    let preview = presenter.present(members);
                    Some(Overlay::Cluster {
                        position: cluster.center.to_point(),
                        icon_px: preview.tier.icon_px(),
                        class_name: preview.tier.class_name(),
                        count: preview.count,
                        preview: preview.lines(),
                    })
                }
            })
            .collect();
        self.replace_layer(Layer::Clusters, overlays);
    }

    /// Radius circle while the filter is active
    pub fn show_distance_filter(&mut self, filter: &DistanceFilter) {
        match filter.center().filter(|_| filter.is_active()) {
            Some(center) => self.replace_layer(
                Layer::Circles,
                [Overlay::Circle {
                    center: center.to_point(),
                    radius_m: filter.radius_km() * 1000.0,
                }],
            ),
            None => self.clear_layer(Layer::Circles),
        }
    }

    pub fn show_route(&mut self, route: &WalkingRoute) {
        let overlays: Vec<Overlay> = route
            .segments
            .iter()
            .map(|segment| Overlay::Polyline {
                line: segment.line_string(),
                dashed: segment.is_estimate(),
            })
            .collect();
        self.replace_layer(Layer::Routes, overlays);
    }

    /// Remove every owned overlay, then release the surface
    pub fn teardown(mut self) -> Box<dyn MapSurface> {
        for layer in Layer::ALL {
            self.clear_layer(layer);
        }
        self.surface.release();
        tracing::debug!("Map surface released");
        self.surface
    }
}

/// Holder allowing a single surface initialization per application lifetime
#[derive(Default)]
pub struct MapSlot {
    handle: Option<MapHandle>,
    initialized: bool,
}

impl MapSlot {
    pub fn attach(&mut self, surface: Box<dyn MapSurface>) -> Result<(), SurfaceError> {
        if self.initialized {
            return Err(SurfaceError::AlreadyAttached);
        }
        self.initialized = true;
        self.handle = Some(MapHandle::new(surface));
        tracing::info!("Map surface attached");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_mut(&mut self) -> Option<&mut MapHandle> {
        self.handle.as_mut()
    }

    /// Tear the handle down; `None` if nothing is attached
    pub fn detach(&mut self) -> Option<Box<dyn MapSurface>> {
        self.handle.take().map(MapHandle::teardown)
    }
}

/// What a [`HeadlessSurface`] currently shows
#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    pub overlays: BTreeMap<OverlayId, Overlay>,
    pub released: bool,
    /// Overlays still present when `release` was called
    pub leaked_on_release: Option<usize>,
    next_id: OverlayId,
}

/// In-memory surface for headless runs and tests
///
/// Clones share the same record, so a caller can keep one to inspect what
/// the engine drew.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    record: Arc<Mutex<SurfaceRecord>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> SurfaceRecord {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MapSurface for HeadlessSurface {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId {
        let mut record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        record.next_id += 1;
        let id = record.next_id;
        tracing::trace!("add overlay {}: {:?}", id, overlay);
        record.overlays.insert(id, overlay);
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .overlays
            .remove(&id);
    }

    fn release(&mut self) {
        let mut record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        record.leaked_on_release = Some(record.overlays.len());
        record.released = true;
    }
}
