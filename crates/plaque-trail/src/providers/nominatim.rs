//! Place search against a Nominatim-compatible geocoder

use super::{PlaceSearchProvider, ProviderError, fetch_text, http_client};
use plaque_trail_lib::{Coordinate, PlaceMatch, RegionBounds};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct NominatimPlaceSearch {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimPlaceSearch {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PlaceSearchProvider for NominatimPlaceSearch {
    async fn search(
        &self,
        query: &str,
        region: &RegionBounds,
        limit: usize,
    ) -> Result<Vec<PlaceMatch>, ProviderError> {
        let limit_param = limit.to_string();
        let viewbox = region.viewbox();
        let request = self.client.get(format!("{}/search", self.base_url)).query(&[
            ("q", query),
            ("format", "jsonv2"),
            ("limit", limit_param.as_str()),
            ("viewbox", viewbox.as_str()),
            ("bounded", "1"),
        ]);

        tracing::debug!("Place search for {:?}", query);
        let body = fetch_text(request).await?;
        parse_places(&body, limit)
    }
}

#[derive(Deserialize)]
struct RawPlace {
    display_name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    addresstype: Option<String>,
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lon: Value,
}

/// Parse a geocoder response body
///
/// The body must be a JSON array. Entries that are not objects, lack a name
/// or carry unusable coordinates are skipped rather than failing the batch.
pub fn parse_places(body: &str, limit: usize) -> Result<Vec<PlaceMatch>, ProviderError> {
    let entries: Vec<Value> =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let mut places = Vec::with_capacity(entries.len().min(limit));
    for entry in entries {
        if places.len() >= limit {
            break;
        }
        let raw: RawPlace = match serde_json::from_value(entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Skipping place entry: {}", e);
                continue;
            }
        };
        let coordinate = match (degrees(&raw.lat), degrees(&raw.lon)) {
            (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
                Ok(coordinate) => coordinate,
                Err(_) => continue,
            },
            _ => continue,
        };
        places.push(PlaceMatch {
            display_name: raw.display_name,
            kind: raw
                .addresstype
                .filter(|kind| !kind.is_empty())
                .or(raw.kind)
                .unwrap_or_default(),
            coordinate,
        });
    }
    Ok(places)
}

/// Geocoders send degrees as strings; accept numbers too
fn degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
