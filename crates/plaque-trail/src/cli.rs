//! Headless command runner behind the `plaque-trail` binary

use crate::AppError;
use crate::engine::PlaqueEngine;
use crate::map_surface::HeadlessSurface;
use crate::providers::{DirectionsProvider, NominatimPlaceSearch, OsrmDirections, PlaceSearchProvider};
use crate::settings::{Command, Settings};
use crate::storage::default_storage_backend;
use plaque_trail_lib::{Coordinate, Marker, SearchResult, format_minutes, geo_math, load_markers};
use std::fs::File;
use std::io::{BufReader, Write};

/// Build the engine from settings, run the requested command, then tear down and persist
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let markers = match &settings.dataset {
        Some(path) => {
            let markers = load_markers(BufReader::new(File::open(path)?))?;
            tracing::info!("Loaded {} markers from {}", markers.len(), path.display());
            markers
        }
        None => {
            tracing::warn!("No dataset given, starting without plaques");
            Vec::new()
        }
    };

    let storage =
        default_storage_backend(settings.storage_file.clone(), settings.ignore_persisted)?;
    let places = if settings.no_place_search {
        None
    } else {
        Some(NominatimPlaceSearch::new(settings.place_search_url.as_str())?)
    };
    let directions = OsrmDirections::new(settings.directions_url.as_str())?;

    let mut engine = PlaqueEngine::new(
        settings.engine_config(),
        settings.runtime_options(),
        markers,
        storage,
        places,
        directions,
    );
    engine.attach_map(Box::new(HeadlessSurface::new()))?;

    let mut out = std::io::stdout().lock();
    let result = execute(&mut engine, settings.command.as_ref(), &mut out).await;

    engine.detach_map();
    engine.persist();
    result
}

/// Run one command against an engine, writing human-readable output
pub async fn execute<P, D, W>(
    engine: &mut PlaqueEngine<P, D>,
    command: Option<&Command>,
    out: &mut W,
) -> Result<(), AppError>
where
    P: PlaceSearchProvider,
    D: DirectionsProvider,
    W: Write,
{
    match command {
        None => summary(engine, out)?,
        Some(Command::Search { query }) => {
            let text = query.join(" ");
            let outcome = engine.search(&text).await;
            if outcome.results().is_empty() {
                writeln!(out, "No results for {text:?}")?;
            }
            for result in outcome.results() {
                writeln!(out, "{}", describe(result))?;
            }
        }
        Some(Command::Nearby {
            lat,
            lon,
            radius_km,
        }) => {
            let center = Coordinate::new(*lat, *lon)?;
            engine.apply_location(center)?;
            let radius = engine.set_radius(*radius_km);

            let visible = engine.visible_markers();
            writeln!(
                out,
                "{} plaques within {:.1} km of {}",
                visible.len(),
                radius,
                center
            )?;
            for marker in visible {
                let distance = marker
                    .coordinate()
                    .map_or(0.0, |position| geo_math::distance_km(center, position));
                writeln!(out, "{:>8.2} km  #{} {}", distance, marker.id, marker.title)?;
            }
            engine.refresh_map();
        }
        Some(Command::Route { ids, optimize }) => {
            for &id in ids {
                if let Err(notice) = engine.add_to_route(id) {
                    writeln!(out, "note: {notice}")?;
                }
            }
            if *optimize && let Err(notice) = engine.optimize_route() {
                writeln!(out, "note: {notice}")?;
            }

            for (position, stop) in engine.route().points().iter().enumerate() {
                writeln!(out, "{:>3}. {}", position + 1, describe_marker(stop))?;
            }
            let stats = engine.route_stats();
            writeln!(
                out,
                "Direct distance {} ({})",
                stats.format_distance(),
                stats.format_duration()
            )?;

            if let Some(route) = engine.walking_route().await {
                for segment in &route.segments {
                    writeln!(
                        out,
                        "  #{} -> #{}: {:.0} m, {}{}",
                        segment.from,
                        segment.to,
                        segment.distance_m,
                        format_minutes(segment.duration_s / 60.0),
                        if segment.is_estimate() { " (estimate)" } else { "" }
                    )?;
                }
                writeln!(
                    out,
                    "Walking {:.0} m, {}",
                    route.total_distance_m(),
                    route.format_duration()
                )?;
            }
        }
        Some(Command::Clusters { zoom }) => {
            let clusters = engine.clusters(*zoom);
            writeln!(out, "{} clusters at zoom {}", clusters.len(), zoom)?;
            for cluster in &clusters {
                let preview = engine.presenter().present(&cluster.members);
                writeln!(
                    out,
                    "[{}] {} plaques around {}",
                    preview.tier.class_name(),
                    preview.count,
                    cluster.center
                )?;
                for line in preview.lines() {
                    writeln!(out, "    {line}")?;
                }
            }
        }
    }
    Ok(())
}

fn summary<P, D, W>(engine: &PlaqueEngine<P, D>, out: &mut W) -> Result<(), AppError>
where
    P: PlaceSearchProvider,
    D: DirectionsProvider,
    W: Write,
{
    let located = engine.markers().iter().filter(|m| m.has_coordinate()).count();
    let view = engine.view();
    writeln!(
        out,
        "{} plaques ({} located), {} visible",
        engine.markers().len(),
        located,
        engine.visible_markers().len()
    )?;
    writeln!(out, "Map at {} (zoom {})", view.center, view.zoom)?;
    let filter = &view.distance_filter;
    if let Some(center) = filter.center().filter(|_| filter.is_active()) {
        writeln!(
            out,
            "Distance filter: {:.1} km around {}",
            filter.radius_km(),
            center
        )?;
    }
    let recent = engine.recent_selections();
    if !recent.is_empty() {
        writeln!(out, "Recent selections:")?;
        for result in &recent {
            writeln!(out, "  {}", describe(result))?;
        }
    }
    Ok(())
}

fn describe(result: &SearchResult) -> String {
    match result {
        SearchResult::Location(place) => {
            format!("[place]    {} ({})", place.display_name, place.kind)
        }
        SearchResult::Plaque(marker) => format!("[plaque]   {}", describe_marker(marker)),
        SearchResult::Category { name, count } => format!("[category] {name} ({count})"),
    }
}

fn describe_marker(marker: &Marker) -> String {
    if marker.profession.is_empty() {
        format!("#{} {}", marker.id, marker.title)
    } else {
        format!("#{} {} ({})", marker.id, marker.title, marker.profession)
    }
}
