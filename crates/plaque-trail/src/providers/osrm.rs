//! Walking directions from an OSRM-compatible routing server

use super::{DirectionsLeg, DirectionsProvider, ProviderError, fetch_text, http_client};
use plaque_trail_lib::Coordinate;
use serde::Deserialize;

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Clone)]
pub struct OsrmDirections {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmDirections {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Route URL for one leg; OSRM takes `lon,lat` pairs
    pub fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/foot/{},{};{},{}",
            self.base_url, from.lon, from.lat, to.lon, to.lat
        )
    }
}

impl DirectionsProvider for OsrmDirections {
    async fn walking_route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<DirectionsLeg, ProviderError> {
        let request = self
            .client
            .get(self.route_url(from, to))
            .query(&[("overview", "full"), ("geometries", "geojson")]);
        let body = fetch_text(request).await?;
        parse_walking_route(&body)
    }
}

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RawRoute>,
}

#[derive(Deserialize)]
struct RawRoute {
    distance: f64,
    duration: f64,
    geometry: RawGeometry,
}

#[derive(Deserialize)]
struct RawGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Parse a routing response into the first route's leg
pub fn parse_walking_route(body: &str) -> Result<DirectionsLeg, ProviderError> {
    let response: RouteResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if response.code != "Ok" {
        return Err(ProviderError::Malformed(match response.message {
            Some(message) => format!("{}: {}", response.code, message),
            None => response.code,
        }));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no routes".into()))?;

    let path = route
        .geometry
        .coordinates
        .iter()
        .map(|&[lon, lat]| Coordinate::new(lat, lon))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let leg = DirectionsLeg {
        path,
        distance_m: route.distance,
        duration_s: route.duration,
    };
    if !leg.is_usable() {
        return Err(ProviderError::Malformed("unusable route geometry".into()));
    }
    Ok(leg)
}
