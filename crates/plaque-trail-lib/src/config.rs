//! Engine configuration
//!
//! Every tunable number used by the search merge, route estimates and cluster
//! previews lives here so the application can override it from the command
//! line without touching the algorithms.

use crate::distance_filter::DEFAULT_RADIUS_KM;
use crate::geo_math::Coordinate;
use crate::route::WALKING_MINUTES_PER_KM;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchLimits,
    pub preview: PreviewLimits,
    /// Walking pace used for duration estimates
    pub minutes_per_km: f64,
    /// Radius applied when a location is resolved without an explicit radius
    pub default_radius_km: f64,
    /// Area place search is biased towards
    pub region: RegionBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search: SearchLimits::default(),
            preview: PreviewLimits::default(),
            minutes_per_km: WALKING_MINUTES_PER_KM,
            default_radius_km: DEFAULT_RADIUS_KM,
            region: RegionBounds::default(),
        }
    }
}

/// Result caps for the search merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Cap on the combined result list
    pub total: usize,
    /// Marker matches kept when the query looks like a place
    pub markers_when_place: usize,
    /// Marker matches kept otherwise
    pub markers: usize,
    /// Provider results prepended to the list
    pub places: usize,
    pub categories: usize,
    /// Entries kept in the recent selections list
    pub recent: usize,
    /// Minimum query length for provider and category lookups
    pub min_query_chars: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            total: 8,
            markers_when_place: 3,
            markers: 6,
            places: 4,
            categories: 2,
            recent: 5,
            min_query_chars: 3,
        }
    }
}

/// Limits for cluster preview content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewLimits {
    /// Clusters larger than this switch to a per-category summary
    pub title_list_max_members: usize,
    pub titles: usize,
    /// Character budget per listed title
    pub title_chars: usize,
    pub categories: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            title_list_max_members: 50,
            titles: 5,
            title_chars: 40,
            categories: 4,
        }
    }
}

/// Geographic bounding box used to bias place search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for RegionBounds {
    /// Greater London
    fn default() -> Self {
        Self {
            west: -0.5103,
            south: 51.2868,
            east: 0.3340,
            north: 51.6919,
        }
    }
}

impl RegionBounds {
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        (self.south..=self.north).contains(&coordinate.lat)
            && (self.west..=self.east).contains(&coordinate.lon)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new_unchecked(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// `west,north,east,south`, the ordering geocoders expect for a viewbox
    pub fn viewbox(&self) -> String {
        format!("{},{},{},{}", self.west, self.north, self.east, self.south)
    }

    /// Parse `west,south,east,north` as given on the command line
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<f64> = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        let [west, south, east, north] = parts.as_slice() else {
            return None;
        };
        let bounds = Self {
            west: *west,
            south: *south,
            east: *east,
            north: *north,
        };
        let corners_valid = Coordinate::new_unchecked(bounds.south, bounds.west).is_valid()
            && Coordinate::new_unchecked(bounds.north, bounds.east).is_valid();
        (corners_valid && bounds.west < bounds.east && bounds.south < bounds.north)
            .then_some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.search.total, 8);
        assert_eq!(config.search.markers_when_place, 3);
        assert_eq!(config.preview.titles, 5);
        assert_eq!(config.minutes_per_km, 12.0);
        assert_eq!(config.default_radius_km, 1.0);
    }

    #[test]
    fn test_default_region_contains_london() {
        let region = RegionBounds::default();
        assert!(region.contains(Coordinate::new_unchecked(51.5074, -0.1278)));
        assert!(!region.contains(Coordinate::new_unchecked(48.8566, 2.3522)));
        assert!(region.contains(region.center()));
    }

    #[test]
    fn test_region_parse() {
        let region = RegionBounds::parse("-3.3, 55.9, -3.1, 56.0").unwrap();
        assert_eq!(region.west, -3.3);
        assert_eq!(region.north, 56.0);
        assert_eq!(region.viewbox(), "-3.3,56,-3.1,55.9");

        assert!(RegionBounds::parse("1,2,3").is_none());
        assert!(RegionBounds::parse("a,b,c,d").is_none());
        assert!(RegionBounds::parse("1,2,0,3").is_none()); // west > east
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"minutes_per_km": 15.0, "search": {"total": 10}}"#).unwrap();
        assert_eq!(config.minutes_per_km, 15.0);
        assert_eq!(config.search.total, 10);
        assert_eq!(config.search.places, 4);
        assert_eq!(config.preview, PreviewLimits::default());
    }
}
