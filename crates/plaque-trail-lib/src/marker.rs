//! Marker (plaque) records
//!
//! Markers are immutable once loaded. The visited/favorite flags are carried
//! along for display but are only ever flipped by the collection layer.

use crate::Result;
use crate::geo_math::Coordinate;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

/// Stable, unique marker identifier
pub type MarkerId = u64;

/// A single geolocated point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub title: String,
    #[serde(default)]
    pub inscription: String,
    /// Free-text street address or location description
    #[serde(default, alias = "location")]
    pub address: String,
    /// Category / profession tag
    #[serde(default)]
    pub profession: String,
    #[serde(default, alias = "colour")]
    pub color: String,
    #[serde(default, alias = "lat", deserialize_with = "lenient_degrees")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon", deserialize_with = "lenient_degrees")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub visited: bool,
    #[serde(default)]
    pub favorite: bool,
}

impl Marker {
    /// Create a marker with only an identifier and a title
    pub fn new(id: MarkerId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            inscription: String::new(),
            address: String::new(),
            profession: String::new(),
            color: String::new(),
            latitude: None,
            longitude: None,
            visited: false,
            favorite: false,
        }
    }

    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn with_profession(mut self, profession: impl Into<String>) -> Self {
        self.profession = profession.into();
        self
    }

    pub fn with_inscription(mut self, inscription: impl Into<String>) -> Self {
        self.inscription = inscription.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// The marker's position, if both components are present and in range
    #[inline]
    pub fn coordinate(&self) -> Option<Coordinate> {
        let coordinate = Coordinate::new_unchecked(self.latitude?, self.longitude?);
        coordinate.is_valid().then_some(coordinate)
    }

    #[inline]
    pub fn has_coordinate(&self) -> bool {
        self.coordinate().is_some()
    }
}

/// Load a JSON array of marker records
///
/// Coordinates given as numbers or numeric strings are accepted; anything
/// else leaves the coordinate absent so the marker stays searchable by text.
pub fn load_markers<R: Read>(reader: R) -> Result<Vec<Marker>> {
    let markers: Vec<Marker> = serde_json::from_reader(reader)?;
    let without_position = markers.iter().filter(|m| !m.has_coordinate()).count();
    if without_position > 0 {
        tracing::debug!(
            "{} of {} markers have no usable coordinates",
            without_position,
            markers.len()
        );
    }
    Ok(markers)
}

fn lenient_degrees<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|degrees| degrees.is_finite()))
}
