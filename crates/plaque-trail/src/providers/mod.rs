//! External place-search and walking-directions providers
//!
//! Both are plain HTTP services. The traits let the engine run against mocks
//! in tests; the HTTP implementations live in [`nominatim`] and [`osrm`], and
//! their payload parsing is exposed as pure functions.
//!
//! Every error here is soft. Callers turn it into an empty result or a
//! straight-line estimate and log it.

use plaque_trail_lib::{Coordinate, PlaceMatch, RegionBounds};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub mod nominatim;
pub mod osrm;

pub use nominatim::NominatimPlaceSearch;
pub use osrm::OsrmDirections;

/// Request timeout for both providers
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider disabled")]
    Disabled,
}

/// Walking path between two stops as returned by a directions provider
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsLeg {
    pub path: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
}

impl DirectionsLeg {
    /// A leg is usable when it has a drawable path and sane totals
    pub fn is_usable(&self) -> bool {
        self.path.len() >= 2
            && self.distance_m.is_finite()
            && self.distance_m >= 0.0
            && self.duration_s.is_finite()
            && self.duration_s >= 0.0
    }
}

pub trait PlaceSearchProvider: Send + Sync {
    /// Places matching `query`, biased to `region`, at most `limit` of them
    fn search(
        &self,
        query: &str,
        region: &RegionBounds,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PlaceMatch>, ProviderError>> + Send;
}

pub trait DirectionsProvider: Send + Sync {
    fn walking_route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> impl Future<Output = Result<DirectionsLeg, ProviderError>> + Send;
}

/// An absent provider behaves as a disabled one
impl<P: PlaceSearchProvider> PlaceSearchProvider for Option<P> {
    async fn search(
        &self,
        query: &str,
        region: &RegionBounds,
        limit: usize,
    ) -> Result<Vec<PlaceMatch>, ProviderError> {
        match self {
            Some(provider) => provider.search(query, region, limit).await,
            None => Err(ProviderError::Disabled),
        }
    }
}

impl<D: DirectionsProvider> DirectionsProvider for Option<D> {
    async fn walking_route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<DirectionsLeg, ProviderError> {
        match self {
            Some(provider) => provider.walking_route(from, to).await,
            None => Err(ProviderError::Disabled),
        }
    }
}

/// Shared HTTP client setup
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Send a GET and return the body of a 2xx response
pub(crate) async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}
