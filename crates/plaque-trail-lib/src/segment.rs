//! Per-leg route geometry
//!
//! A walking route is drawn as one segment per consecutive pair of located
//! stops. Segments either come from a walking-directions provider or are
//! straight-line estimates, which the map draws differently (dashed).

use crate::geo_math::{self, Coordinate};
use crate::route::format_minutes;
use crate::{Marker, MarkerId};
use geo::LineString;

/// Where a segment's geometry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Path returned by the directions provider
    Walking,
    /// Direct line between the two stops
    Estimate,
}

/// One leg of a route between two consecutive stops
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub from: MarkerId,
    pub to: MarkerId,
    /// Ordered path, starting at `from` and ending at `to`
    pub path: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub kind: SegmentKind,
}

impl RouteSegment {
    /// Straight line between two stops, timed at the given walking pace
    pub fn straight_line(
        from: (MarkerId, Coordinate),
        to: (MarkerId, Coordinate),
        minutes_per_km: f64,
    ) -> Self {
        let distance_km = geo_math::distance_km(from.1, to.1);
        Self {
            from: from.0,
            to: to.0,
            path: vec![from.1, to.1],
            distance_m: distance_km * 1000.0,
            duration_s: distance_km * minutes_per_km * 60.0,
            kind: SegmentKind::Estimate,
        }
    }

    #[inline]
    pub fn is_estimate(&self) -> bool {
        self.kind == SegmentKind::Estimate
    }

    pub fn line_string(&self) -> LineString<f64> {
        geo_math::line_string(self.path.iter().copied())
    }
}

/// Consecutive pairs of located stops
///
/// Stops without coordinates are skipped, so their neighbors are joined
/// directly.
pub fn segment_pairs(points: &[Marker]) -> Vec<((MarkerId, Coordinate), (MarkerId, Coordinate))> {
    let located: Vec<(MarkerId, Coordinate)> = points
        .iter()
        .filter_map(|m| m.coordinate().map(|c| (m.id, c)))
        .collect();
    located.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

/// All legs of a route, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkingRoute {
    pub segments: Vec<RouteSegment>,
}

impl WalkingRoute {
    /// Straight-line legs for every consecutive pair, no provider involved
    pub fn straight_lines(points: &[Marker], minutes_per_km: f64) -> Self {
        Self {
            segments: segment_pairs(points)
                .into_iter()
                .map(|(from, to)| RouteSegment::straight_line(from, to, minutes_per_km))
                .collect(),
        }
    }

    pub fn total_distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_m).sum()
    }

    pub fn total_duration_s(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_s).sum()
    }

    pub fn estimate_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_estimate()).count()
    }

    /// Whether any leg had to fall back to a straight line
    pub fn has_estimates(&self) -> bool {
        self.estimate_count() > 0
    }

    pub fn format_duration(&self) -> String {
        format_minutes(self.total_duration_s() / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Vec<Marker> {
        vec![
            Marker::new(1, "A").with_position(51.5074, -0.1278),
            Marker::new(2, "No location"),
            Marker::new(3, "B").with_position(51.5174, -0.1278),
            Marker::new(4, "C").with_position(51.5174, -0.1178),
        ]
    }

    #[test]
    fn test_segment_pairs_skip_unlocated_stops() {
        let pairs = segment_pairs(&stops());
        let ids: Vec<(MarkerId, MarkerId)> = pairs.iter().map(|(a, b)| (a.0, b.0)).collect();
        assert_eq!(ids, vec![(1, 3), (3, 4)]);
    }

    #[test]
    fn test_segment_pairs_need_two_located_stops() {
        assert!(segment_pairs(&[]).is_empty());
        assert!(segment_pairs(&stops()[..2]).is_empty());
    }

    #[test]
    fn test_straight_line_segment() {
        let a = (1, Coordinate::new_unchecked(51.5074, -0.1278));
        let b = (2, Coordinate::new_unchecked(51.5174, -0.1278));
        let segment = RouteSegment::straight_line(a, b, 12.0);
        assert!(segment.is_estimate());
        assert_eq!(segment.path.len(), 2);
        assert!((segment.distance_m - 1112.0).abs() < 5.0);
        // 1.112 km at 12 min/km
        assert!((segment.duration_s - 1.112 * 12.0 * 60.0).abs() < 5.0);
    }

    #[test]
    fn test_straight_lines_route_totals() {
        let route = WalkingRoute::straight_lines(&stops(), 12.0);
        assert_eq!(route.segments.len(), 2);
        assert_eq!(route.estimate_count(), 2);
        assert!(route.has_estimates());
        let expected: f64 = route.segments.iter().map(|s| s.distance_m).sum();
        assert_eq!(route.total_distance_m(), expected);
        assert!(route.format_duration().ends_with("min"));
    }
}
