use crate::engine::{DEFAULT_CLUSTER_CELL_PX, RuntimeOptions};
use crate::providers::nominatim::DEFAULT_NOMINATIM_URL;
use crate::providers::osrm::DEFAULT_OSRM_URL;
use clap::{Parser, Subcommand};
use plaque_trail_lib::{EngineConfig, MarkerId, RegionBounds, WALKING_MINUTES_PER_KM};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Plaque Trail - find historical plaques around you and plan walking tours between them
pub struct Settings {
    /// Marker dataset to load (JSON array of plaque records)
    #[clap(short, long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Storage file for the map view and recent selections
    #[clap(long, value_name = "FILE")]
    pub storage_file: Option<PathBuf>,

    /// Ignore previously persisted state and keep nothing on disk
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,

    /// Route legs through the walking-directions provider instead of straight lines
    #[clap(long, default_value = "false")]
    pub walking: bool,

    /// Base URL of the place-search (geocoding) service
    #[clap(long, default_value = DEFAULT_NOMINATIM_URL)]
    pub place_search_url: String,

    /// Never query the place-search service
    #[clap(long, default_value = "false")]
    pub no_place_search: bool,

    /// Base URL of the walking-directions service
    #[clap(long, default_value = DEFAULT_OSRM_URL)]
    pub directions_url: String,

    /// Area place search is biased to, as west,south,east,north (default: Greater London)
    #[clap(long, value_name = "W,S,E,N", value_parser = parse_region, allow_hyphen_values = true)]
    pub region: Option<RegionBounds>,

    /// Walking pace used for duration estimates
    #[clap(long, default_value_t = WALKING_MINUTES_PER_KM, value_parser = parse_pace)]
    pub minutes_per_km: f64,

    /// Quiet time before a search query runs
    #[clap(long, default_value = "300")]
    pub search_debounce_ms: u64,

    /// Quiet time before view changes are written to storage
    #[clap(long, default_value = "500")]
    pub persist_debounce_ms: u64,

    /// How long to wait for a position fix
    #[clap(long, default_value = "10")]
    pub locate_timeout_secs: u64,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one search and print the merged results
    Search {
        #[clap(required = true)]
        query: Vec<String>,
    },
    /// List plaques within a radius of a point
    Nearby {
        #[clap(allow_negative_numbers = true)]
        lat: f64,
        #[clap(allow_negative_numbers = true)]
        lon: f64,
        /// Filter radius, clamped to 0.1-10 km
        #[clap(short, long, default_value = "1.0")]
        radius_km: f64,
    },
    /// Build a route from plaque ids and print its legs
    Route {
        #[clap(required = true)]
        ids: Vec<MarkerId>,
        /// Reorder interior stops by nearest neighbor
        #[clap(long, default_value = "false")]
        optimize: bool,
    },
    /// Print cluster previews for the visible plaques at a zoom level
    Clusters {
        #[clap(default_value = "13")]
        zoom: u8,
    },
}

fn parse_region(value: &str) -> Result<RegionBounds, String> {
    RegionBounds::parse(value).ok_or_else(|| {
        format!("expected four comma-separated degrees west,south,east,north, got {value:?}")
    })
}

fn parse_pace(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(pace) if pace.is_finite() && pace > 0.0 => Ok(pace),
        Ok(_) => Err(format!("walking pace must be a positive number of minutes, got {value}")),
        Err(e) => Err(e.to_string()),
    }
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            minutes_per_km: self.minutes_per_km,
            region: self.region.unwrap_or_default(),
            ..EngineConfig::default()
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            persist_debounce: Duration::from_millis(self.persist_debounce_ms),
            locate_timeout: Duration::from_secs(self.locate_timeout_secs),
            walking_mode: self.walking,
            cluster_cell_px: DEFAULT_CLUSTER_CELL_PX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["plaque-trail"]);
        assert!(settings.dataset.is_none());
        assert!(!settings.ignore_persisted);
        assert!(!settings.walking);
        assert_eq!(settings.place_search_url, DEFAULT_NOMINATIM_URL);
        assert!(settings.command.is_none());

        let config = settings.engine_config();
        assert_eq!(config, EngineConfig::default());

        let options = settings.runtime_options();
        assert_eq!(options.search_debounce, Duration::from_millis(300));
        assert_eq!(options.persist_debounce, Duration::from_millis(500));
        assert_eq!(options.locate_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_region_override() {
        let settings =
            Settings::parse_from(["plaque-trail", "--region", "-3.3,55.9,-3.1,56.0", "--walking"]);
        let region = settings.engine_config().region;
        assert_eq!(region.west, -3.3);
        assert_eq!(region.north, 56.0);
        assert!(settings.runtime_options().walking_mode);

        assert!(Settings::try_parse_from(["plaque-trail", "--region", "1,2,3"]).is_err());
    }

    #[test]
    fn test_walking_pace_must_be_positive() {
        let settings = Settings::parse_from(["plaque-trail", "--minutes-per-km", "15.5"]);
        assert_eq!(settings.engine_config().minutes_per_km, 15.5);

        for bad in ["0", "-3", "NaN", "inf", "fast"] {
            assert!(
                Settings::try_parse_from(["plaque-trail", "--minutes-per-km", bad]).is_err(),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_subcommands() {
        let settings = Settings::parse_from(["plaque-trail", "nearby", "51.5", "-0.12", "-r", "2"]);
        assert_eq!(
            settings.command,
            Some(Command::Nearby {
                lat: 51.5,
                lon: -0.12,
                radius_km: 2.0
            })
        );

        let settings = Settings::parse_from(["plaque-trail", "route", "3", "1", "2", "--optimize"]);
        assert_eq!(
            settings.command,
            Some(Command::Route {
                ids: vec![3, 1, 2],
                optimize: true
            })
        );

        let settings = Settings::parse_from(["plaque-trail", "search", "Baker", "Street"]);
        assert_eq!(
            settings.command,
            Some(Command::Search {
                query: vec!["Baker".to_string(), "Street".to_string()]
            })
        );
    }
}
