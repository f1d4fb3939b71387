//! Route geometry from a walking-directions provider
//!
//! One provider request per consecutive pair of located stops. A failed leg
//! falls back to a straight-line estimate without affecting the other legs.

use crate::debounce::EpochCounter;
use crate::providers::DirectionsProvider;
use plaque_trail_lib::{Marker, RouteSegment, SegmentKind, WalkingRoute, segment_pairs};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct WalkingRouteAdapter<D> {
    provider: D,
    minutes_per_km: f64,
    walking_mode: AtomicBool,
    epochs: EpochCounter,
}

impl<D: DirectionsProvider> WalkingRouteAdapter<D> {
    pub fn new(provider: D, minutes_per_km: f64, walking_mode: bool) -> Self {
        Self {
            provider,
            minutes_per_km,
            walking_mode: AtomicBool::new(walking_mode),
            epochs: EpochCounter::new(),
        }
    }

    pub fn walking_mode(&self) -> bool {
        self.walking_mode.load(Ordering::SeqCst)
    }

    /// Toggle provider routing; any computation in flight becomes stale
    pub fn set_walking_mode(&self, enabled: bool) {
        self.walking_mode.store(enabled, Ordering::SeqCst);
        self.epochs.advance();
    }

    /// Make any computation in flight stale
    pub fn cancel(&self) {
        self.epochs.advance();
    }

    /// Geometry for every leg of `points`
    ///
    /// Without walking mode the legs are straight lines and the provider is
    /// never called. Returns `None` when a newer computation started before
    /// this one finished.
    pub async fn compute(&self, points: &[Marker]) -> Option<WalkingRoute> {
        let epoch = self.epochs.advance();
        if !self.walking_mode() {
            return Some(WalkingRoute::straight_lines(points, self.minutes_per_km));
        }

        let pairs = segment_pairs(points);
        let mut segments = Vec::with_capacity(pairs.len());
        for (from, to) in pairs {
            let segment = match self.provider.walking_route(from.1, to.1).await {
                Ok(leg) if leg.is_usable() => RouteSegment {
                    from: from.0,
                    to: to.0,
                    path: leg.path,
                    distance_m: leg.distance_m,
                    duration_s: leg.duration_s,
                    kind: SegmentKind::Walking,
                },
                Ok(_) => {
                    tracing::warn!("Unusable walking leg {} -> {}, using estimate", from.0, to.0);
                    RouteSegment::straight_line(from, to, self.minutes_per_km)
                }
                Err(e) => {
                    tracing::warn!("Walking leg {} -> {} failed: {}", from.0, to.0, e);
                    RouteSegment::straight_line(from, to, self.minutes_per_km)
                }
            };

            if !self.epochs.is_current(epoch) {
                tracing::debug!("Discarding stale walking route");
                return None;
            }
            segments.push(segment);
        }

        let route = WalkingRoute { segments };
        tracing::debug!(
            "Walking route: {} legs, {} estimated",
            route.segments.len(),
            route.estimate_count()
        );
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{DirectionsLeg, ProviderError};
    use plaque_trail_lib::Coordinate;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails for legs starting at `fail_from_lat`; every other leg gets a three-point path
    #[derive(Default)]
    struct MockDirections {
        fail_from_lat: Option<f64>,
        delay: Duration,
        calls: Mutex<usize>,
    }

    impl DirectionsProvider for MockDirections {
        async fn walking_route(
            &self,
            from: Coordinate,
            to: Coordinate,
        ) -> Result<DirectionsLeg, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_from_lat == Some(from.lat) {
                return Err(ProviderError::Status(502));
            }
            let via = Coordinate::new_unchecked(from.lat, to.lon);
            Ok(DirectionsLeg {
                path: vec![from, via, to],
                distance_m: 1500.0,
                duration_s: 1100.0,
            })
        }
    }

    fn stops() -> Vec<Marker> {
        vec![
            Marker::new(1, "A").with_position(51.500, -0.120),
            Marker::new(2, "B").with_position(51.505, -0.125),
            Marker::new(3, "Unlocated"),
            Marker::new(4, "C").with_position(51.510, -0.130),
            Marker::new(5, "D").with_position(51.515, -0.135),
        ]
    }

    #[tokio::test]
    async fn test_without_walking_mode_provider_is_not_called() {
        let adapter = WalkingRouteAdapter::new(MockDirections::default(), 12.0, false);
        let route = adapter.compute(&stops()).await.unwrap();
        assert_eq!(route.segments.len(), 3);
        assert_eq!(route.estimate_count(), 3);
        assert_eq!(*adapter.provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_leg_falls_back_alone() {
        let adapter = WalkingRouteAdapter::new(
            MockDirections {
                fail_from_lat: Some(51.505),
                ..MockDirections::default()
            },
            12.0,
            true,
        );
        let route = adapter.compute(&stops()).await.unwrap();

        let kinds: Vec<SegmentKind> = route.segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::Walking, SegmentKind::Estimate, SegmentKind::Walking]
        );
        assert_eq!(route.segments[1].from, 2);
        assert_eq!(route.segments[1].to, 4);
        assert_eq!(route.segments[0].path.len(), 3);
        assert_eq!(route.segments[1].path.len(), 2);
        assert_eq!(*adapter.provider.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_disabled_provider_gives_estimates() {
        let adapter: WalkingRouteAdapter<Option<MockDirections>> =
            WalkingRouteAdapter::new(None, 12.0, true);
        let route = adapter.compute(&stops()).await.unwrap();
        assert_eq!(route.estimate_count(), 3);
    }

    #[tokio::test]
    async fn test_too_few_located_stops() {
        let adapter = WalkingRouteAdapter::new(MockDirections::default(), 12.0, true);
        let route = adapter.compute(&stops()[..1]).await.unwrap();
        assert!(route.segments.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_computation_is_discarded() {
        let adapter = WalkingRouteAdapter::new(
            MockDirections {
                delay: Duration::from_millis(200),
                ..MockDirections::default()
            },
            12.0,
            true,
        );
        let points = stops();
        let (first, second) = tokio::join!(adapter.compute(&points), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            adapter.compute(&points[..2]).await
        });
        assert!(first.is_none());
        assert_eq!(second.unwrap().segments.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggling_mode_supersedes_in_flight_route() {
        let adapter = WalkingRouteAdapter::new(
            MockDirections {
                delay: Duration::from_millis(200),
                ..MockDirections::default()
            },
            12.0,
            true,
        );
        let points = stops();
        let (route, ()) = tokio::join!(adapter.compute(&points), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            adapter.set_walking_mode(false);
        });
        assert!(route.is_none());
        assert!(!adapter.walking_mode());
    }
}
