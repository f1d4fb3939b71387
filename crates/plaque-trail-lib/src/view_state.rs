//! Serializable snapshot of the map viewport and filters

use crate::DistanceFilter;
use crate::geo_math::Coordinate;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: u8 = 2;
pub const MAX_ZOOM: u8 = 19;

/// Central London, where the dataset is densest
const DEFAULT_CENTER: Coordinate = Coordinate::new_unchecked(51.5074, -0.1278);
const DEFAULT_ZOOM: u8 = 13;

/// Viewport, distance filter and resolved search location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewState {
    pub center: Coordinate,
    pub zoom: u8,
    pub distance_filter: DistanceFilter,
    pub search_location: Option<Coordinate>,
}

impl Default for MapViewState {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            distance_filter: DistanceFilter::default(),
            search_location: None,
        }
    }
}

impl MapViewState {
    /// Replace anything out of range with its default
    ///
    /// Stored state can be hand-edited or written by an older build, so it is
    /// checked field by field rather than trusted.
    pub fn sanitized(mut self) -> Self {
        if !self.center.is_valid() {
            tracing::warn!("Discarding invalid stored map center {:?}", self.center);
            self.center = DEFAULT_CENTER;
        }
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);

        let filter_broken = self
            .distance_filter
            .center()
            .is_some_and(|center| !center.is_valid())
            || !(self.distance_filter.radius_km().is_finite()
                && self.distance_filter.radius_km() > 0.0)
            || (self.distance_filter.visible() && self.distance_filter.center().is_none());
        if filter_broken {
            tracing::warn!("Discarding invalid stored distance filter");
            self.distance_filter = DistanceFilter::default();
        }

        if self.search_location.is_some_and(|c| !c.is_valid()) {
            self.search_location = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = MapViewState::default();
        assert!(state.center.is_valid());
        assert_eq!(state.zoom, DEFAULT_ZOOM);
        assert!(!state.distance_filter.is_active());
        assert!(state.search_location.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut state = MapViewState {
            center: Coordinate::new_unchecked(51.52, -0.09),
            zoom: 16,
            ..MapViewState::default()
        };
        state
            .distance_filter
            .set(Coordinate::new_unchecked(51.52, -0.09), 2.5, true)
            .unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: MapViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let state: MapViewState = serde_json::from_str(r#"{"zoom": 15}"#).unwrap();
        assert_eq!(state.zoom, 15);
        assert_eq!(state.center, DEFAULT_CENTER);
        assert_eq!(state.distance_filter, DistanceFilter::default());
    }

    #[test]
    fn test_sanitized_repairs_bad_fields() {
        let state: MapViewState = serde_json::from_str(
            r#"{
                "center": {"lat": 123.0, "lon": 0.0},
                "zoom": 40,
                "distance_filter": {"center": null, "radius_km": -3.0, "visible": true},
                "search_location": {"lat": 0.0, "lon": 500.0}
            }"#,
        )
        .unwrap();

        let state = state.sanitized();
        assert_eq!(state.center, DEFAULT_CENTER);
        assert_eq!(state.zoom, MAX_ZOOM);
        assert_eq!(state.distance_filter, DistanceFilter::default());
        assert!(state.search_location.is_none());
    }

    #[test]
    fn test_sanitized_keeps_valid_state() {
        let state = MapViewState {
            zoom: 17,
            search_location: Some(Coordinate::new_unchecked(51.5, -0.1)),
            ..MapViewState::default()
        };
        assert_eq!(state.clone().sanitized(), state);
    }
}
