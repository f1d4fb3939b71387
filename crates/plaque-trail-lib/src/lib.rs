//! Plaque Trail Library - Geospatial Discovery & Route Planning
//!
//! This library holds the synchronous, I/O-free core used by the Plaque Trail
//! application: distance math over WGS84 coordinates, radius filtering of the
//! marker set, free-text query scoring and result merging, walking-route
//! construction and optimization, and the grouping logic behind map clusters.
//!
//! # Architecture
//!
//! - **[`geo_math`]**: Haversine distance, route length, bounds and midpoints
//! - **[`Marker`]**: Immutable point of interest loaded from a dataset
//! - **[`DistanceFilter`]**: Center + radius predicate over the marker set
//! - **[`SearchClassifier`]**: Place-intent scoring and multi-source merge
//! - **[`RouteEngine`]**: Duplicate-free stop sequence with nearest-neighbor optimization
//! - **[`ClusterPresenter`]**: Size tiers and preview content for grouped markers
//! - **[`MapViewState`]**: Serializable viewport + filter snapshot
//!
//! Everything that talks to the network, the clock or durable storage lives in
//! the `plaque-trail` crate, which drives these types.

mod cluster;
mod config;
mod distance_filter;
pub mod geo_math;
mod marker;
mod recent;
mod route;
mod search;
mod segment;
pub mod utils;
mod view_state;

// Public API exports
pub use cluster::{Cluster, ClusterPresenter, ClusterPreview, PreviewBody, SizeTier, cluster_markers};
pub use config::{EngineConfig, PreviewLimits, RegionBounds, SearchLimits};
pub use distance_filter::{DEFAULT_RADIUS_KM, DistanceFilter, MAX_RADIUS_KM, MIN_RADIUS_KM, clamp_radius};
pub use geo_math::Coordinate;
pub use marker::{Marker, MarkerId, load_markers};
pub use recent::RecentSelections;
pub use route::{RouteEngine, RouteStats, WALKING_MINUTES_PER_KM, format_minutes};
pub use search::{PlaceMatch, Query, SearchClassifier, SearchPlan, SearchResult, place_intent};
pub use segment::{RouteSegment, SegmentKind, WalkingRoute, segment_pairs};
pub use view_state::{MAX_ZOOM, MIN_ZOOM, MapViewState};

/// Error types for the engine core
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid coordinate: ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Invalid radius: {0} km")]
    InvalidRadius(f64),

    #[error("Dataset parsing error: {0}")]
    Dataset(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Advisory outcome of a route operation that left the route unchanged.
///
/// These are never fatal: the caller shows the message and carries on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteNotice {
    #[error("\"{title}\" is already in your route")]
    AlreadyInRoute { id: MarkerId, title: String },

    #[error("Add at least 3 stops to optimize the route (currently {len})")]
    TooFewPoints { len: usize },

    #[error("Stop {id} has no known location")]
    MissingCoordinates { id: MarkerId },

    #[error("No stop at position {index}")]
    IndexOutOfRange { index: usize },

    #[error("No marker with id {id}")]
    UnknownMarker { id: MarkerId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn() -> RouteEngine = RouteEngine::new;
        let _: fn() -> DistanceFilter = DistanceFilter::new;
        let _: fn() -> EngineConfig = EngineConfig::default;
    }

    #[test]
    fn test_notice_messages_name_the_marker() {
        let notice = RouteNotice::AlreadyInRoute {
            id: 7,
            title: "Charles Dickens".to_string(),
        };
        assert!(notice.to_string().contains("Charles Dickens"));
        assert!(
            RouteNotice::TooFewPoints { len: 2 }
                .to_string()
                .contains("currently 2")
        );
    }
}
