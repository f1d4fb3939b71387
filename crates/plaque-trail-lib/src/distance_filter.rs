//! Radius-based filtering of the marker set

use crate::geo_math::{self, Coordinate};
use crate::{EngineError, Marker, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RADIUS_KM: f64 = 1.0;

/// Range offered by the radius control; enforcement is up to the caller
pub const MIN_RADIUS_KM: f64 = 0.1;
pub const MAX_RADIUS_KM: f64 = 10.0;

/// Above this many markers the filter fans out over rayon's thread pool
const PARALLEL_THRESHOLD: usize = 4096;

/// Clamp a radius to the range offered by the UI
#[inline]
pub fn clamp_radius(radius_km: f64) -> f64 {
    if radius_km.is_nan() {
        return DEFAULT_RADIUS_KM;
    }
    radius_km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM)
}

/// Center + radius predicate over markers
///
/// The center is always present while the filter is visible; `set` is the
/// only way to make it visible and it requires a valid center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceFilter {
    center: Option<Coordinate>,
    radius_km: f64,
    visible: bool,
}

impl Default for DistanceFilter {
    fn default() -> Self {
        Self {
            center: None,
            radius_km: DEFAULT_RADIUS_KM,
            visible: false,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DistanceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace center, radius and visibility in one step
    pub fn set(&mut self, center: Coordinate, radius_km: f64, visible: bool) -> Result<()> {
        if !center.is_valid() {
            return Err(EngineError::InvalidCoordinate {
                lat: center.lat,
                lon: center.lon,
            });
        }
        validate_radius(radius_km)?;

        self.center = Some(center);
        self.radius_km = radius_km;
        self.visible = visible;
        Ok(())
    }

    /// Change the radius, keeping center and visibility
    pub fn update_radius(&mut self, radius_km: f64) -> Result<()> {
        validate_radius(radius_km)?;
        self.radius_km = radius_km;
        Ok(())
    }

    /// Drop the center and hide the filter; the radius is kept for next time
    pub fn clear(&mut self) {
        self.center = None;
        self.visible = false;
    }

    /// True iff a center is set and the filter is visible
    #[inline]
    pub fn is_active(&self) -> bool {
        self.center.is_some() && self.visible
    }

    #[inline]
    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    #[inline]
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Whether the marker lies within the radius (boundary inclusive)
    ///
    /// Markers without usable coordinates never match.
    pub fn contains(&self, marker: &Marker) -> bool {
        match (self.center, marker.coordinate()) {
            (Some(center), Some(position)) => {
                geo_math::distance_km(center, position) <= self.radius_km
            }
            _ => false,
        }
    }

    /// Markers inside the radius, in input order
    ///
    /// An inactive filter passes every marker through untouched.
    pub fn apply<'a>(&self, markers: &'a [Marker]) -> Vec<&'a Marker> {
        #[cfg(feature = "profiling")]
        profiling::scope!("distance_filter::apply");

        if !self.is_active() {
            return markers.iter().collect();
        }

        if markers.len() >= PARALLEL_THRESHOLD {
            // Indexed collect keeps the input order
            markers.par_iter().filter(|m| self.contains(m)).collect()
        } else {
            markers.iter().filter(|m| self.contains(m)).collect()
        }
    }
}

fn validate_radius(radius_km: f64) -> Result<()> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidRadius(radius_km))
    }
}
