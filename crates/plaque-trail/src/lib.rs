//! Plaque Trail - Application Library
//!
//! Runtime around `plaque-trail-lib`: persisted map view state, debounced
//! search with place-search results, walking directions with straight-line
//! fallback, current-position lookup and an explicit map-surface handle, all
//! behind the [`PlaqueEngine`] facade. The `plaque-trail` binary drives it
//! headlessly from the command line.

pub mod cli;
pub mod debounce;
pub mod engine;
pub mod geolocation;
pub mod logging;
pub mod map_surface;
pub mod providers;
pub mod search_session;
pub mod settings;
pub mod storage;
pub mod view_store;
pub mod walking;

pub use engine::{PlaqueEngine, RuntimeOptions};
pub use search_session::{SearchOutcome, SearchSession};
pub use settings::{Command, Settings};
pub use view_store::MapViewStore;
pub use walking::WalkingRouteAdapter;

/// Errors that end a headless run
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] plaque_trail_lib::EngineError),

    #[error(transparent)]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Provider(#[from] providers::ProviderError),

    #[error(transparent)]
    Surface(#[from] map_surface::SurfaceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
