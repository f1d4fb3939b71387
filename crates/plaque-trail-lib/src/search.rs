//! Free-text search: query scoring, local matching and result merging
//!
//! The classifier never performs I/O. The application asks it for a
//! [`SearchPlan`], runs the place-search provider if the plan says so, and
//! hands the provider's matches back to [`SearchClassifier::merge`].
//!
//! Place intent is a score, not a branch: it only changes the mix of results
//! (how many marker matches are kept), never which sources are consulted.

use crate::config::SearchLimits;
use crate::geo_math::Coordinate;
use crate::{Marker, MarkerId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Score at or above which a query is treated as "likely a place"
pub const PLACE_INTENT_THRESHOLD: f32 = 0.5;

/// UK postcode, full ("SW1A 1AA") or outward code only ("SW1A")
static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{1,2}\d[a-z\d]?(\s*\d[a-z]{2})?$").expect("valid postcode pattern")
});

/// Raw "lat, lon" or "lat lon" pair
static COORDINATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d{1,2}(?:\.\d+)?)\s*[,\s]\s*(-?\d{1,3}(?:\.\d+)?)$")
        .expect("valid coordinate pattern")
});

/// Address suffixes that rarely appear in a person's name
const ADDRESS_WORDS: &[&str] = &[
    "street", "road", "rd", "square", "sq", "park", "borough", "lane", "ln", "avenue", "ave",
    "gardens", "gdns", "crescent", "terrace", "mews", "station",
];

/// Place words that are also common surnames ("Octavia Hill", "Graham Green")
///
/// They only count next to a house number or another address word.
const AMBIGUOUS_PLACE_WORDS: &[&str] = &[
    "st", "place", "hill", "bridge", "court", "row", "way", "common", "green", "village", "town",
];

/// A place returned by the place-search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub display_name: String,
    /// Provider classification ("street", "suburb", "station", ...)
    pub kind: String,
    pub coordinate: Coordinate,
}

/// One entry of the merged result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    Location(PlaceMatch),
    Plaque(Marker),
    Category { name: String, count: usize },
}

impl SearchResult {
    /// Identity used for de-duplication
    pub fn key(&self) -> String {
        match self {
            Self::Location(place) => format!(
                "location:{}:{:.5}:{:.5}",
                place.display_name.to_lowercase(),
                place.coordinate.lat,
                place.coordinate.lon
            ),
            Self::Plaque(marker) => format!("plaque:{}", marker.id),
            Self::Category { name, .. } => format!("category:{}", name.to_lowercase()),
        }
    }

    /// Primary display text
    pub fn label(&self) -> &str {
        match self {
            Self::Location(place) => &place.display_name,
            Self::Plaque(marker) => &marker.title,
            Self::Category { name, .. } => name,
        }
    }

    /// Where the map should fly to when this result is picked
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Location(place) => Some(place.coordinate),
            Self::Plaque(marker) => marker.coordinate(),
            Self::Category { .. } => None,
        }
    }

    pub fn marker_id(&self) -> Option<MarkerId> {
        match self {
            Self::Plaque(marker) => Some(marker.id),
            _ => None,
        }
    }
}

/// A normalized query. The raw text keeps its casing for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    normalized: String,
}

impl Query {
    pub fn new(text: &str) -> Self {
        let raw = text.trim().to_string();
        let normalized = raw.to_lowercase();
        Self { raw, normalized }
    }

    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.normalized.chars().count()
    }

    pub fn has_digits(&self) -> bool {
        self.normalized.chars().any(|c| c.is_ascii_digit())
    }

    /// The query as a coordinate, when it is a raw "lat, lon" pair
    pub fn as_coordinate(&self) -> Option<Coordinate> {
        let captures = COORDINATE_PAIR.captures(&self.normalized)?;
        let lat = captures.get(1)?.as_str().parse::<f64>().ok()?;
        let lon = captures.get(2)?.as_str().parse::<f64>().ok()?;
        Coordinate::new(lat, lon).ok()
    }
}

/// How strongly a query reads like a place rather than a marker or category
///
/// Returns a weight in `[0, 1]`.
pub fn place_intent(query: &Query) -> f32 {
    let text = query.normalized();
    if text.is_empty() {
        return 0.0;
    }

    if POSTCODE.is_match(text) || query.as_coordinate().is_some() {
        return 1.0;
    }

    let short_numeric =
        query.char_len() <= 5 && text.chars().all(|c| c.is_ascii_digit() || c == ' ');
    if short_numeric {
        return 0.8;
    }

    // Keywords only count as a suffix, never as the first word
    let mut address = 0;
    let mut ambiguous = 0;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .skip(1)
    {
        if ADDRESS_WORDS.contains(&word) {
            address += 1;
        } else if AMBIGUOUS_PLACE_WORDS.contains(&word) {
            ambiguous += 1;
        }
    }
    if address == 0 && !query.has_digits() {
        ambiguous = 0;
    }

    match (address + ambiguous, query.has_digits()) {
        (0, _) => 0.0,
        (1, false) => 0.7,
        _ => 0.9,
    }
}

/// What a search for a given query should consult, and how much to keep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPlan {
    pub place_intent: f32,
    pub place_likely: bool,
    pub marker_limit: usize,
    pub query_places: bool,
    pub match_categories: bool,
}

/// Query classification and result merging
#[derive(Debug, Clone, Default)]
pub struct SearchClassifier {
    limits: SearchLimits,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SearchClassifier {
    pub fn new(limits: SearchLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Decide the result mix for a query
    pub fn plan(&self, query: &Query) -> SearchPlan {
        let intent = place_intent(query);
        let place_likely = intent >= PLACE_INTENT_THRESHOLD;
        let long_enough = query.char_len() >= self.limits.min_query_chars;

        SearchPlan {
            place_intent: intent,
            place_likely,
            marker_limit: if place_likely {
                self.limits.markers_when_place
            } else {
                self.limits.markers
            },
            query_places: !query.is_empty() && (place_likely || long_enough),
            match_categories: long_enough && !query.has_digits(),
        }
    }

    /// Markers whose title, inscription, address or profession contain the query
    ///
    /// Title prefix matches rank first, then other title matches, then
    /// matches in the remaining fields; input order breaks ties.
    pub fn match_markers<'a>(
        &self,
        markers: &'a [Marker],
        query: &Query,
        limit: usize,
    ) -> Vec<&'a Marker> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let needle = query.normalized();

        let mut ranked: Vec<(u8, &Marker)> = markers
            .iter()
            .filter_map(|marker| {
                let title = marker.title.to_lowercase();
                let rank = if title.starts_with(needle) {
                    0
                } else if title.contains(needle) {
                    1
                } else if [&marker.inscription, &marker.address, &marker.profession]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle))
                {
                    2
                } else {
                    return None;
                };
                Some((rank, marker))
            })
            .collect();

        // Stable sort keeps input order within a rank
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().take(limit).map(|(_, m)| m).collect()
    }

    /// Profession values containing the query, with member counts
    ///
    /// Ordered by descending count; first-seen order breaks ties.
    pub fn match_categories(&self, markers: &[Marker], query: &Query) -> Vec<SearchResult> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.normalized();

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, (String, usize)> = HashMap::new();
        for marker in markers {
            let name = marker.profession.trim();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            if !key.contains(needle) {
                continue;
            }
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    (name.to_string(), 0)
                })
                .1 += 1;
        }

        let mut categories: Vec<(String, usize)> = order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1));

        categories
            .into_iter()
            .take(self.limits.categories)
            .map(|(name, count)| SearchResult::Category { name, count })
            .collect()
    }

    /// Marker and category results for a query, per its plan
    pub fn local_results(
        &self,
        markers: &[Marker],
        query: &Query,
        plan: &SearchPlan,
    ) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .match_markers(markers, query, plan.marker_limit)
            .into_iter()
            .cloned()
            .map(SearchResult::Plaque)
            .collect();

        if plan.match_categories {
            results.extend(self.match_categories(markers, query));
        }

        results
    }

    /// Places first (capped), then local results; de-duplicated and truncated
    ///
    /// A query that is itself a coordinate pair contributes a location of its
    /// own ahead of the provider's matches.
    pub fn merge(
        &self,
        query: &Query,
        places: Vec<PlaceMatch>,
        local: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        let typed_location = query.as_coordinate().map(|coordinate| PlaceMatch {
            display_name: query.raw().to_string(),
            kind: "coordinates".to_string(),
            coordinate,
        });

        let places = typed_location
            .into_iter()
            .chain(places.into_iter().filter(|p| p.coordinate.is_valid()))
            .take(self.limits.places)
            .map(SearchResult::Location);

        let mut seen = HashSet::new();
        places
            .chain(local)
            .filter(|result| seen.insert(result.key()))
            .take(self.limits.total)
            .collect()
    }
}
