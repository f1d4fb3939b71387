//! Current-position requests with a bounded wait

use plaque_trail_lib::Coordinate;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Why no position could be obtained; shown to the user, never fatal
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeolocationError {
    #[error("Location permission was denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Location request timed out after {0:?}")]
    Timeout(Duration),
}

/// A device fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters
    pub accuracy_m: f64,
}

pub trait PositionProvider: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<Position, GeolocationError>> + Send;
}

/// Ask `provider` for a fix, giving up after `timeout`
///
/// A fix with an out-of-range coordinate counts as unavailable.
pub async fn locate<P: PositionProvider>(
    provider: &P,
    timeout: Duration,
) -> Result<Position, GeolocationError> {
    let position = tokio::time::timeout(timeout, provider.current_position())
        .await
        .map_err(|_| GeolocationError::Timeout(timeout))??;

    if !position.coordinate.is_valid() {
        return Err(GeolocationError::Unavailable(format!(
            "invalid fix {}",
            position.coordinate
        )));
    }
    tracing::info!(
        "Located at {} (±{:.0} m)",
        position.coordinate,
        position.accuracy_m
    );
    Ok(position)
}

/// A position known up front, e.g. given on the command line
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

impl PositionProvider for FixedPosition {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Ok(self.0)
    }
}

/// Stand-in for hosts without a location source
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

impl PositionProvider for NoPosition {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Err(GeolocationError::Unavailable("no location source".into()))
    }
}
