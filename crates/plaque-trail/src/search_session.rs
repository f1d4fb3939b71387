//! Debounced, last-request-wins search
//!
//! Input is debounced before classification runs. Each settled query carries
//! the debouncer's epoch through the provider call; if a newer query settled in
//! the meantime the older one's results are dropped on arrival.

use crate::debounce::{Debouncer, Epoch};
use crate::providers::PlaceSearchProvider;
use crate::storage::{RECENT_SELECTIONS_KEY, StorageBackend, load_json_backend, save_json_backend};
use lru::LruCache;
use plaque_trail_lib::{
    EngineConfig, Marker, PlaceMatch, Query, RecentSelections, RegionBounds, SearchClassifier,
    SearchResult,
};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Place results kept per normalized query
pub const PLACE_CACHE_CAPACITY: usize = 32;

/// What a call to [`SearchSession::search`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results {
        query: String,
        results: Vec<SearchResult>,
    },
    /// The query was empty; recent selections are shown instead
    Recent(Vec<SearchResult>),
    /// A newer query took over before this one finished
    Superseded,
}

impl SearchOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchOutcome::Results { results, .. } => results,
            SearchOutcome::Recent(recent) => recent,
            SearchOutcome::Superseded => &[],
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, SearchOutcome::Superseded)
    }
}

pub struct SearchSession<P> {
    classifier: SearchClassifier,
    provider: P,
    region: RegionBounds,
    debouncer: Debouncer,
    place_cache: Mutex<LruCache<String, Vec<PlaceMatch>>>,
    recent: Mutex<RecentSelections>,
    storage: Arc<dyn StorageBackend>,
    latest: Mutex<Option<(Epoch, Vec<SearchResult>)>>,
    passes: AtomicUsize,
}

impl<P: PlaceSearchProvider> SearchSession<P> {
    pub fn new(
        config: &EngineConfig,
        provider: P,
        storage: Arc<dyn StorageBackend>,
        debounce: Duration,
    ) -> Self {
        let capacity = config.search.recent;
        let stored = load_json_backend::<Vec<SearchResult>>(storage.as_ref(), RECENT_SELECTIONS_KEY);
        let recent = match stored {
            Ok(Some(items)) => RecentSelections::from_items(items, capacity),
            Ok(None) => RecentSelections::with_capacity(capacity),
            Err(e) => {
                tracing::warn!("Discarding stored recent selections: {}", e);
                RecentSelections::with_capacity(capacity)
            }
        };

        Self {
            classifier: SearchClassifier::new(config.search.clone()),
            provider,
            region: config.region,
            debouncer: Debouncer::new(debounce),
            place_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(PLACE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            recent: Mutex::new(recent),
            storage,
            latest: Mutex::new(None),
            passes: AtomicUsize::new(0),
        }
    }

    /// Run a query against `markers` and the place provider
    ///
    /// Returns [`SearchOutcome::Superseded`] when a newer call arrives within
    /// the debounce window or while the provider is still answering.
    pub async fn search(&self, markers: &[Marker], text: &str) -> SearchOutcome {
        let query = Query::new(text);
        if query.is_empty() {
            self.debouncer.cancel();
            return SearchOutcome::Recent(self.recent());
        }

        let Some(epoch) = self.debouncer.settle().await else {
            tracing::debug!("Search for {:?} superseded during debounce", query.raw());
            return SearchOutcome::Superseded;
        };

        self.passes.fetch_add(1, Ordering::SeqCst);
        let plan = self.classifier.plan(&query);
        let local = self.classifier.local_results(markers, &query, &plan);
        tracing::debug!(
            "Search {:?}: intent {:.2}, {} local results",
            query.raw(),
            plan.place_intent,
            local.len()
        );

        let places = if plan.query_places {
            self.places(&query).await
        } else {
            Vec::new()
        };

        if !self.debouncer.is_current(epoch) {
            tracing::debug!("Dropping stale results for {:?}", query.raw());
            return SearchOutcome::Superseded;
        }

        let results = self.classifier.merge(&query, places, local);
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((epoch, results.clone()));
        SearchOutcome::Results {
            query: query.raw().to_string(),
            results,
        }
    }

    /// Provider matches for a query; failures are logged and yield nothing
    async fn places(&self, query: &Query) -> Vec<PlaceMatch> {
        let key = query.normalized().to_string();
        let cached = self
            .place_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let limit = self.classifier.limits().places;
        match self.provider.search(query.raw(), &self.region, limit).await {
            Ok(places) => {
                self.place_cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .put(key, places.clone());
                places
            }
            Err(e) => {
                tracing::warn!("Place search failed for {:?}: {}", query.raw(), e);
                Vec::new()
            }
        }
    }

    /// Results of the most recent query that was not superseded
    pub fn latest_results(&self) -> Option<Vec<SearchResult>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, results)| results.clone())
    }

    /// Number of queries that made it past the debounce window
    pub fn classification_passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Drop whatever query is pending or in flight
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn recent(&self) -> Vec<SearchResult> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items()
            .to_vec()
    }

    /// Remember a picked result and persist the list
    pub fn record_selection(&self, result: SearchResult) {
        let items = {
            let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            recent.push(result);
            recent.items().to_vec()
        };
        self.store_recent(&items);
    }

    pub fn clear_recent(&self) {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.store_recent(&[]);
    }

    fn store_recent(&self, items: &[SearchResult]) {
        if let Err(e) = save_json_backend(self.storage.as_ref(), RECENT_SELECTIONS_KEY, &items) {
            tracing::warn!("Failed to persist recent selections: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::storage::MemoryStorage;
    use plaque_trail_lib::Coordinate;

    #[derive(Default)]
    struct MockPlaces {
        delay: Duration,
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl MockPlaces {
        fn calls(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PlaceSearchProvider for MockPlaces {
        async fn search(
            &self,
            query: &str,
            _region: &RegionBounds,
            limit: usize,
        ) -> Result<Vec<PlaceMatch>, ProviderError> {
            self.seen.lock().unwrap().push(query.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ProviderError::Status(503));
            }
            Ok((0..6)
                .map(|i| PlaceMatch {
                    display_name: format!("{query} place {i}"),
                    kind: "suburb".to_string(),
                    coordinate: Coordinate::new_unchecked(51.50 + i as f64 * 0.01, -0.12),
                })
                .take(limit)
                .collect())
        }
    }

    fn markers() -> Vec<Marker> {
        let mut markers: Vec<Marker> = (0..8)
            .map(|i| {
                Marker::new(i, format!("Charles Dickens residence {i}"))
                    .with_profession("Novelist")
                    .with_address("SW1A 1AA")
                    .with_position(51.50 + i as f64 * 0.001, -0.14)
            })
            .collect();
        markers.push(
            Marker::new(100, "William Shakespeare")
                .with_profession("Playwright")
                .with_position(51.51, -0.10),
        );
        markers
    }

    fn session(provider: MockPlaces) -> SearchSession<MockPlaces> {
        SearchSession::new(
            &EngineConfig::default(),
            provider,
            Arc::new(MemoryStorage::new()),
            DEFAULT_SEARCH_DEBOUNCE,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_queries_in_window_classify_once_with_second_text() {
        let session = session(MockPlaces::default());
        let markers = markers();

        let (first, second) = tokio::join!(session.search(&markers, "Dick"), async {
            tokio::time::sleep(Duration::from_millis(120)).await;
            session.search(&markers, "Shakespeare").await
        });

        assert!(first.is_superseded());
        assert_eq!(session.classification_passes(), 1);
        assert_eq!(session.provider.calls(), vec!["Shakespeare".to_string()]);
        match second {
            SearchOutcome::Results { query, results } => {
                assert_eq!(query, "Shakespeare");
                assert!(results.iter().any(|r| r.marker_id() == Some(100)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_is_discarded() {
        let session = session(MockPlaces {
            delay: Duration::from_millis(1000),
            ..MockPlaces::default()
        });
        let markers = markers();

        // The first query settles and is waiting on the provider when the second arrives
        let (first, second) = tokio::join!(session.search(&markers, "Dickens"), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            session.search(&markers, "Shakespeare").await
        });

        assert!(first.is_superseded());
        assert_eq!(session.classification_passes(), 2);
        assert_eq!(second.results(), session.latest_results().unwrap().as_slice());
        assert!(
            second
                .results()
                .iter()
                .all(|r| !r.label().contains("Dickens"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_keeps_local_results() {
        let session = session(MockPlaces {
            fail: true,
            ..MockPlaces::default()
        });
        let outcome = session.search(&markers(), "Dickens").await;
        let results = outcome.results();
        assert!(!results.is_empty());
        assert!(
            results
                .iter()
                .all(|r| !matches!(r, SearchResult::Location(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_places_are_prepended_and_capped() {
        let session = session(MockPlaces::default());
        let outcome = session.search(&markers(), "Dickens").await;
        let results = outcome.results();

        assert_eq!(results.len(), 8);
        assert!(
            results[..4]
                .iter()
                .all(|r| matches!(r, SearchResult::Location(_)))
        );
        assert!(matches!(results[4], SearchResult::Plaque(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_postcode_query_limits_marker_results() {
        let session = session(MockPlaces {
            fail: true,
            ..MockPlaces::default()
        });
        let outcome = session.search(&markers(), "SW1A 1AA").await;
        let plaques = outcome
            .results()
            .iter()
            .filter(|r| matches!(r, SearchResult::Plaque(_)))
            .count();
        assert_eq!(plaques, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_results_are_cached_per_query() {
        let session = session(MockPlaces::default());
        let markers = markers();
        session.search(&markers, "Dickens").await;
        session.search(&markers, "  DICKENS ").await;
        assert_eq!(session.provider.calls().len(), 1);
        assert_eq!(session.classification_passes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_shows_recent_selections() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let config = EngineConfig::default();
        let session = SearchSession::new(
            &config,
            MockPlaces::default(),
            storage.clone(),
            DEFAULT_SEARCH_DEBOUNCE,
        );

        assert_eq!(session.search(&[], "   ").await, SearchOutcome::Recent(vec![]));

        for marker in markers().into_iter().take(7) {
            session.record_selection(SearchResult::Plaque(marker));
        }
        let recent = session.search(&[], "").await;
        assert_eq!(recent.results().len(), 5);
        assert_eq!(recent.results()[0].marker_id(), Some(6));
        assert_eq!(session.classification_passes(), 0);

        // A new session over the same storage sees the same list
        let reopened = SearchSession::new(&config, MockPlaces::default(), storage, Duration::ZERO);
        assert_eq!(reopened.recent(), session.recent());

        reopened.clear_recent();
        assert!(reopened.recent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_cancels_pending_search() {
        let session = session(MockPlaces::default());
        let markers = markers();
        let (pending, cleared) = tokio::join!(session.search(&markers, "Dickens"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.search(&markers, "").await
        });
        assert!(pending.is_superseded());
        assert!(matches!(cleared, SearchOutcome::Recent(_)));
        assert!(session.latest_results().is_none());
    }
}
