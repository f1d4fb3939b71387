//! Great-circle math over WGS84 coordinates
//!
//! All distances are in kilometers on a sphere of radius [`EARTH_RADIUS_KM`].
//! Callers are expected to guard against invalid coordinates; the helpers that
//! take collections skip invalid entries themselves.

use crate::{EngineError, Result};
use geo::{Coord, LineString, Point, Rect};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A (latitude, longitude) pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a validated coordinate
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let coordinate = Self { lat, lon };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(EngineError::InvalidCoordinate { lat, lon })
        }
    }

    /// Create a coordinate without range checks (for trusted input)
    #[inline]
    pub const fn new_unchecked(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite and inside [-90, 90] / [-180, 180]
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Convert to a `geo` point (x = longitude, y = latitude)
    #[inline]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Convert from a `geo` point (x = longitude, y = latitude)
    #[inline]
    pub fn from_point(point: Point<f64>) -> Self {
        Self::new_unchecked(point.y(), point.x())
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_point()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Haversine distance between two coordinates in kilometers
///
/// Symmetric, never negative, and exactly 0 for identical points.
#[inline]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum of consecutive-pair distances over the valid points, in kilometers
///
/// Returns 0 when fewer than two valid points are given.
pub fn route_length_km<I>(points: I) -> f64
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut total = 0.0;
    let mut previous: Option<Coordinate> = None;

    for point in points.into_iter().filter(Coordinate::is_valid) {
        if let Some(prev) = previous {
            total += distance_km(prev, point);
        }
        previous = Some(point);
    }

    total
}

/// Bounding box (x = longitude, y = latitude) of the valid points
pub fn bounds<I>(points: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut min = Coord {
        x: f64::INFINITY,
        y: f64::INFINITY,
    };
    let mut max = Coord {
        x: f64::NEG_INFINITY,
        y: f64::NEG_INFINITY,
    };
    let mut found = false;

    for point in points.into_iter().filter(Coordinate::is_valid) {
        min.x = min.x.min(point.lon);
        min.y = min.y.min(point.lat);
        max.x = max.x.max(point.lon);
        max.y = max.y.max(point.lat);
        found = true;
    }

    found.then(|| Rect::new(min, max))
}

/// Great-circle midpoint between two coordinates
pub fn midpoint(a: Coordinate, b: Coordinate) -> Coordinate {
    let lat1 = a.lat.to_radians();
    let lon1 = a.lon.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let bx = lat2.cos() * delta_lon.cos();
    let by = lat2.cos() * delta_lon.sin();

    let lat = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by.powi(2)).sqrt());
    let lon = lon1 + by.atan2(lat1.cos() + bx);

    // Normalize longitude back into [-180, 180]
    let lon = (lon.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinate::new_unchecked(lat.to_degrees(), lon)
}

/// Arithmetic mean of the valid points
///
/// Good enough for marker groups spanning a few kilometers; not meant for
/// sets straddling the antimeridian.
pub fn centroid<I>(points: I) -> Option<Coordinate>
where
    I: IntoIterator<Item = Coordinate>,
{
    let (count, lat_sum, lon_sum) = points
        .into_iter()
        .filter(Coordinate::is_valid)
        .fold((0usize, 0.0, 0.0), |(n, lat, lon), p| {
            (n + 1, lat + p.lat, lon + p.lon)
        });

    (count > 0).then(|| {
        Coordinate::new_unchecked(lat_sum / count as f64, lon_sum / count as f64)
    })
}

/// Polyline (x = longitude, y = latitude) over the valid points
pub fn line_string<I>(points: I) -> LineString<f64>
where
    I: IntoIterator<Item = Coordinate>,
{
    points
        .into_iter()
        .filter(Coordinate::is_valid)
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect()
}
