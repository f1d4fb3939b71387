//! Web Mercator conversions used for screen-space grouping of markers

use geo::Point;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -EARTH_MERCATOR_MAX;
pub const EARTH_SIZE_METERS: f64 = EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Edge length of a slippy-map tile in pixels
pub const TILE_SIZE_PX: f64 = 256.0;

const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the representable range, so markers near the poles
/// collapse onto the map edge instead of producing infinities.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;

    Point::new(x, y)
}

/// Width of the whole world in pixels at the given zoom level
#[inline]
pub fn world_size_px(zoom: u8) -> f64 {
    TILE_SIZE_PX * 2f64.powi(i32::from(zoom))
}

/// Mercator meters covered by one pixel at the given zoom level
#[inline]
pub fn meters_per_pixel(zoom: u8) -> f64 {
    EARTH_SIZE_METERS / world_size_px(zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!(point.x().abs() < 0.01);
        assert!(point.y().abs() < 0.01);
    }

    #[test]
    fn test_london_projects_west_and_north_of_origin() {
        let point = wgs84_to_mercator(51.5074, -0.1278);
        assert!(point.x() < 0.0 && point.x() > -20_000.0);
        assert!(point.y() > 6_700_000.0 && point.y() < 6_720_000.0);
    }

    #[test]
    fn test_polar_latitude_is_clamped() {
        let point = wgs84_to_mercator(90.0, 0.0);
        assert!(point.y().is_finite());
        assert!(point.y() <= EARTH_MERCATOR_MAX + 1.0);
    }

    #[test]
    fn test_pixel_scale_halves_per_zoom_level() {
        assert!((world_size_px(0) - 256.0).abs() < f64::EPSILON);
        let ratio = meters_per_pixel(10) / meters_per_pixel(11);
        assert!((ratio - 2.0).abs() < 1e-9);
    }
}
