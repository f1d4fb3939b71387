//! Performance benchmarks for plaque-trail-lib
//!
//! Run with: cargo bench --package plaque-trail-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use plaque_trail_lib::{
    ClusterPresenter, Coordinate, DistanceFilter, Marker, Query, RouteEngine, SearchClassifier,
    cluster_markers,
};

const PROFESSIONS: &[&str] = &["Writer", "Painter", "Scientist", "Engineer", "Actor", ""];

/// Generate markers scattered over central London in a deterministic spiral
fn generate_markers(count: usize) -> Vec<Marker> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            let angle = t * 400.0;
            let radius = t * 0.08;
            let marker = Marker::new(i as u64, format!("Marker {i} of the spiral"))
                .with_profession(PROFESSIONS[i % PROFESSIONS.len()])
                .with_inscription("Lived and worked here");
            // Every 50th marker has no position, like the real dataset
            if i % 50 == 0 {
                marker
            } else {
                marker.with_position(51.5074 + radius * angle.sin(), -0.1278 + radius * angle.cos())
            }
        })
        .collect()
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_distance_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance_filter");

    let mut filter = DistanceFilter::new();
    filter
        .set(Coordinate::new_unchecked(51.5074, -0.1278), 2.0, true)
        .unwrap();

    for size in [1_000usize, 20_000] {
        let markers = generate_markers(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &markers, |b, markers| {
            b.iter(|| filter.apply(markers));
        });
    }

    group.finish();
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");
    group.sample_size(20);

    for stops in [10usize, 100, 500] {
        let markers: Vec<Marker> = generate_markers(stops * 2)
            .into_iter()
            .filter(Marker::has_coordinate)
            .take(stops)
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(stops), &markers, |b, markers| {
            b.iter(|| {
                let mut route = RouteEngine::new();
                route.replace(markers.clone());
                route.optimize().unwrap();
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let markers = generate_markers(20_000);
    let classifier = SearchClassifier::default();

    for text in ["spiral", "SW1A 1AA", "writer"] {
        let query = Query::new(text);
        group.bench_function(text, |b| {
            b.iter(|| {
                let plan = classifier.plan(&query);
                classifier.local_results(&markers, &query, &plan)
            });
        });
    }

    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");
    group.sample_size(20);

    let markers = generate_markers(20_000);
    let presenter = ClusterPresenter::default();

    for zoom in [11u8, 15] {
        group.bench_with_input(BenchmarkId::new("cluster_and_preview", zoom), &zoom, |b, &zoom| {
            b.iter(|| {
                cluster_markers(&markers, zoom, 60.0)
                    .iter()
                    .map(|cluster| presenter.present(&cluster.members))
                    .count()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_distance_filter,
    bench_optimize,
    bench_search,
    bench_clustering,
);

criterion_main!(benches);
