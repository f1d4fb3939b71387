//! Walking-route construction and optimization
//!
//! A route is an ordered, duplicate-free list of markers. The first stop is the
//! start and the last the end. Every edit computes the next sequence and hands
//! it to a single commit point, which is where the no-duplicates invariant is
//! enforced and the revision counter advances.

use crate::geo_math::{self, Coordinate};
use crate::{Marker, MarkerId, RouteNotice};
use geo::LineString;
use std::collections::HashSet;

/// Walking pace used for duration estimates
pub const WALKING_MINUTES_PER_KM: f64 = 12.0;

/// Ordered stop list with derived statistics
#[derive(Debug, Clone)]
pub struct RouteEngine {
    points: Vec<Marker>,
    minutes_per_km: f64,
    /// Bumped on every committed change so dependents can tell stale work apart
    revision: u64,
}

impl Default for RouteEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Length and walking-time estimate for a route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStats {
    pub stops: usize,
    pub distance_km: f64,
    pub duration_minutes: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteEngine {
    pub fn new() -> Self {
        Self::with_pace(WALKING_MINUTES_PER_KM)
    }

    pub fn with_pace(minutes_per_km: f64) -> Self {
        Self {
            points: Vec::new(),
            minutes_per_km,
            revision: 0,
        }
    }

    #[inline]
    pub fn points(&self) -> &[Marker] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.points.iter().any(|m| m.id == id)
    }

    pub fn position(&self, id: MarkerId) -> Option<usize> {
        self.points.iter().position(|m| m.id == id)
    }

    /// Designated start (meaningful once the route has two stops)
    pub fn start(&self) -> Option<&Marker> {
        self.points.first()
    }

    /// Designated end (meaningful once the route has two stops)
    pub fn end(&self) -> Option<&Marker> {
        (self.points.len() >= 2).then(|| self.points.last()).flatten()
    }

    /// Append a marker at the end of the route
    pub fn add(&mut self, marker: Marker) -> Result<(), RouteNotice> {
        if self.contains(marker.id) {
            return Err(RouteNotice::AlreadyInRoute {
                id: marker.id,
                title: marker.title,
            });
        }
        let mut next = self.points.clone();
        next.push(marker);
        self.commit(next);
        Ok(())
    }

    /// Remove a marker by identifier; absent markers are ignored
    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        let index = self.position(id)?;
        let mut next = self.points.clone();
        let removed = next.remove(index);
        self.commit(next);
        Some(removed)
    }

    /// Replace the whole sequence
    ///
    /// Later occurrences of an identifier are dropped; their ids are returned.
    /// Membership is not compared with the previous sequence.
    pub fn replace(&mut self, sequence: Vec<Marker>) -> Vec<MarkerId> {
        let mut seen = HashSet::with_capacity(sequence.len());
        let mut dropped = Vec::new();
        let mut next = Vec::with_capacity(sequence.len());
        for marker in sequence {
            if seen.insert(marker.id) {
                next.push(marker);
            } else {
                dropped.push(marker.id);
            }
        }
        if !dropped.is_empty() {
            tracing::warn!("Dropped duplicate route stops: {:?}", dropped);
        }
        self.commit(next);
        dropped
    }

    /// Replace the sequence with a caller-reordered one
    pub fn reorder(&mut self, sequence: Vec<Marker>) -> Vec<MarkerId> {
        self.replace(sequence)
    }

    /// Move the stop at `from` so that it ends up at index `to`
    pub fn move_point(&mut self, from: usize, to: usize) -> Result<(), RouteNotice> {
        let len = self.points.len();
        if from >= len {
            return Err(RouteNotice::IndexOutOfRange { index: from });
        }
        if to >= len {
            return Err(RouteNotice::IndexOutOfRange { index: to });
        }
        if from == to {
            return Ok(());
        }
        let mut next = self.points.clone();
        let marker = next.remove(from);
        next.insert(to, marker);
        self.commit(next);
        Ok(())
    }

    pub fn clear(&mut self) {
        if !self.points.is_empty() {
            self.commit(Vec::new());
        }
    }

    /// Reorder the interior stops with a nearest-neighbor pass
    ///
    /// The first and last stops stay where they are. Starting from the first,
    /// the closest not-yet-placed interior stop is appended repeatedly; the
    /// first candidate at the minimal distance wins. Interior stops without
    /// coordinates cannot be measured and keep their relative order after the
    /// measured ones.
    pub fn optimize(&mut self) -> Result<(), RouteNotice> {
        #[cfg(feature = "profiling")]
        profiling::scope!("route::optimize");

        let len = self.points.len();
        if len < 3 {
            return Err(RouteNotice::TooFewPoints { len });
        }

        let start = &self.points[0];
        let end = &self.points[len - 1];
        let mut current = start
            .coordinate()
            .ok_or(RouteNotice::MissingCoordinates { id: start.id })?;
        if end.coordinate().is_none() {
            return Err(RouteNotice::MissingCoordinates { id: end.id });
        }

        let interior = &self.points[1..len - 1];
        let mut remaining: Vec<(usize, Coordinate)> = Vec::with_capacity(interior.len());
        let mut unmeasured: Vec<usize> = Vec::new();
        for (index, marker) in interior.iter().enumerate() {
            match marker.coordinate() {
                Some(coordinate) => remaining.push((index, coordinate)),
                None => unmeasured.push(index),
            }
        }

        let mut order: Vec<usize> = Vec::with_capacity(interior.len());
        while !remaining.is_empty() {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (slot, (_, coordinate)) in remaining.iter().enumerate() {
                let distance = geo_math::distance_km(current, *coordinate);
                if distance < best_distance {
                    best = slot;
                    best_distance = distance;
                }
            }
            // `remove` rather than `swap_remove` keeps input order for ties
            let (index, coordinate) = remaining.remove(best);
            order.push(index);
            current = coordinate;
        }
        order.extend(unmeasured);

        let mut next = Vec::with_capacity(len);
        next.push(self.points[0].clone());
        next.extend(order.into_iter().map(|i| interior[i].clone()));
        next.push(self.points[len - 1].clone());

        tracing::debug!(
            "Optimized route of {} stops: {:.2} km -> {:.2} km",
            len,
            self.stats().distance_km,
            geo_math::route_length_km(next.iter().filter_map(Marker::coordinate))
        );
        self.commit(next);
        Ok(())
    }

    /// Coordinates of the stops that have one, in route order
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().filter_map(Marker::coordinate).collect()
    }

    /// Route polyline (x = longitude, y = latitude) for the map surface
    pub fn line_string(&self) -> LineString<f64> {
        geo_math::line_string(self.coordinates())
    }

    /// Total length and walking-time estimate
    pub fn stats(&self) -> RouteStats {
        let distance_km = geo_math::route_length_km(self.coordinates());
        RouteStats {
            stops: self.points.len(),
            distance_km,
            duration_minutes: distance_km * self.minutes_per_km,
        }
    }

    fn commit(&mut self, next: Vec<Marker>) {
        debug_assert!(
            {
                let mut ids = HashSet::new();
                next.iter().all(|m| ids.insert(m.id))
            },
            "route stops must be unique"
        );
        self.points = next;
        self.revision += 1;
    }
}

impl RouteStats {
    /// "850 m" below one kilometer, "2.35 km" above
    pub fn format_distance(&self) -> String {
        let meters = (self.distance_km * 1000.0).round();
        if meters < 1000.0 {
            format!("{meters:.0} m")
        } else {
            format!("{:.2} km", self.distance_km)
        }
    }

    /// "N min" below an hour, "Hh Mm" from an hour on
    pub fn format_duration(&self) -> String {
        format_minutes(self.duration_minutes)
    }
}

/// Format a minute count as "N min" or "Hh Mm"
pub fn format_minutes(minutes: f64) -> String {
    let total = if minutes.is_finite() {
        minutes.max(0.0).round() as u64
    } else {
        0
    };
    if total < 60 {
        format!("{total} min")
    } else {
        format!("{}h {}m", total / 60, total % 60)
    }
}
