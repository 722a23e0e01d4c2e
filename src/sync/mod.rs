//! Album synchronization engine.
//!
//! Orchestrates the lifecycle of a pin's photo album: search the remote
//! service by coordinate, persist the whole batch as placeholder records,
//! publish them so readers immediately see a full grid of loading tiles,
//! then fan out the image downloads and swap real bytes in photo by photo.
//!
//! Per-photo failures degrade that photo only — its record keeps the
//! placeholder and the rest of the batch proceeds. At most one batch may be
//! in flight per pin; a second request for the same pin is rejected rather
//! than queued.

pub mod error;
pub mod fetch;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::flickr::{PhotoSearch, SearchErrorKind, SearchQuery};
use crate::store::{NewPhoto, PhotoKey, PhotoRecord, PinKey, PinRecord, Store, StoreError};

pub use error::SyncError;
pub use fetch::{FetchError, HttpImageFetcher, ImageFetcher};

const NOTIFY_CHANNEL_CAPACITY: usize = 64;

/// Out-of-band progress signals for album consumers. These complement the
/// store's commit events: the store says *what changed*, notifications say
/// *how a batch went*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumNotification {
    /// The location search failed; no records were written.
    SearchFailed {
        pin: PinKey,
        kind: SearchErrorKind,
        message: String,
    },
    /// The search succeeded but matched zero photos.
    EmptyResult { pin: PinKey },
    /// Every download attempt in the batch has resolved. Sent exactly once
    /// per populated batch.
    BatchComplete {
        pin: PinKey,
        fetched: usize,
        failed: usize,
    },
}

/// What a populate request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The pin already had photos; nothing was fetched.
    AlreadyPopulated,
    /// The search matched zero photos; the album stays empty.
    Empty,
    /// A batch ran: `fetched` photos got real bytes, `failed` kept the
    /// placeholder.
    Populated { fetched: usize, failed: usize },
}

/// Drives search, placeholder creation, and download fan-out for pin albums.
pub struct AlbumSyncEngine {
    store: Arc<Store>,
    search: Arc<dyn PhotoSearch>,
    fetcher: Arc<dyn ImageFetcher>,
    config: EngineConfig,
    /// Pins with a batch currently in flight.
    active: Mutex<HashSet<PinKey>>,
    notify: broadcast::Sender<AlbumNotification>,
}

impl std::fmt::Debug for AlbumSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumSyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AlbumSyncEngine {
    pub fn new(
        store: Arc<Store>,
        search: Arc<dyn PhotoSearch>,
        fetcher: Arc<dyn ImageFetcher>,
        config: EngineConfig,
    ) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self {
            store,
            search,
            fetcher,
            config,
            active: Mutex::new(HashSet::new()),
            notify,
        }
    }

    /// Build an engine with HTTP-backed search and download transports,
    /// sharing one connection pool between them.
    pub fn with_http(store: Arc<Store>, config: EngineConfig) -> Self {
        let http = reqwest::Client::new();
        let search = Arc::new(crate::flickr::FlickrClient::new(
            http.clone(),
            config.api_key.clone(),
            config.search_timeout,
        ));
        let fetcher = Arc::new(HttpImageFetcher::new(http, config.download_timeout));
        Self::new(store, search, fetcher, config)
    }

    /// Subscribe to batch progress notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<AlbumNotification> {
        self.notify.subscribe()
    }

    /// Make sure a pin has an album: if any photo records exist the call is
    /// a no-op, otherwise search-and-populate runs to completion before the
    /// call returns.
    pub async fn ensure_photos(&self, pin: PinKey) -> Result<BatchOutcome, SyncError> {
        let record = self.store.pin(pin).await?;
        let _guard = self.claim(pin)?;

        if self.store.photo_count(pin).await? > 0 {
            return Ok(BatchOutcome::AlreadyPopulated);
        }
        self.populate(&record).await
    }

    /// Discard a pin's current album and fetch a fresh batch. The old
    /// photos disappear in one commit before the new placeholders appear,
    /// so readers never see the two batches mixed.
    pub async fn refresh_album(&self, pin: PinKey) -> Result<BatchOutcome, SyncError> {
        let record = self.store.pin(pin).await?;
        let _guard = self.claim(pin)?;

        let removed = self.store.delete_photos_for_pin(pin).await?;
        tracing::debug!(pin = %pin, removed, "cleared album for refresh");
        self.populate(&record).await
    }

    /// Remove one photo from its album. Passes through to the store; safe
    /// while a batch for a sibling photo is still downloading.
    pub async fn delete_photo(&self, key: PhotoKey) -> Result<(), SyncError> {
        self.store.delete_photo(key).await?;
        Ok(())
    }

    async fn populate(&self, pin: &PinRecord) -> Result<BatchOutcome, SyncError> {
        let query = SearchQuery {
            accuracy: self.config.accuracy,
            latitude: pin.coordinate.latitude(),
            longitude: pin.coordinate.longitude(),
            page: 1,
            per_page: self.config.per_page,
        };

        let descriptors = match self.search.search(&query).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!(pin = %pin.key, error = %e, "photo search failed");
                self.send(AlbumNotification::SearchFailed {
                    pin: pin.key,
                    kind: e.kind(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        if descriptors.is_empty() {
            tracing::info!(pin = %pin.key, "search matched no photos");
            self.send(AlbumNotification::EmptyResult { pin: pin.key });
            return Ok(BatchOutcome::Empty);
        }

        let new_photos: Vec<NewPhoto> = descriptors
            .into_iter()
            .map(|d| NewPhoto {
                title: d.title,
                remote_url: d.url,
            })
            .collect();

        // The whole batch becomes visible as placeholders before any
        // download starts: readers see the album's final shape immediately.
        let records = self
            .store
            .create_photos(pin.key, &new_photos, &self.config.placeholder)
            .await?;
        self.store.publish_pin_photos(pin.key).await?;
        tracing::info!(pin = %pin.key, photos = records.len(), "published placeholder batch");

        let results: Vec<Option<bool>> = stream::iter(records)
            .map(|photo| async move { self.fetch_one(&photo).await })
            .buffer_unordered(self.config.concurrent_downloads)
            .collect()
            .await;

        let fetched = results.iter().filter(|r| **r == Some(true)).count();
        let failed = results.iter().filter(|r| **r == Some(false)).count();
        tracing::info!(pin = %pin.key, fetched, failed, "album batch complete");
        self.send(AlbumNotification::BatchComplete {
            pin: pin.key,
            fetched,
            failed,
        });
        Ok(BatchOutcome::Populated { fetched, failed })
    }

    /// Download one photo's bytes and swap them in. `Some(true)` on
    /// success, `Some(false)` on a failure that leaves the placeholder in
    /// place. A photo deleted mid-download yields `None` and is counted as
    /// neither fetched nor failed.
    async fn fetch_one(&self, photo: &PhotoRecord) -> Option<bool> {
        let url = match &photo.remote_url {
            Some(url) => url,
            None => {
                tracing::warn!(photo = %photo.key, "photo record has no remote url");
                return Some(false);
            }
        };

        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(photo = %photo.key, error = %e, "image download failed");
                return Some(false);
            }
        };
        if bytes.is_empty() {
            tracing::warn!(photo = %photo.key, url, "image download returned empty body");
            return Some(false);
        }

        if let Err(e) = self.store.update_photo_image(photo.key, &bytes).await {
            return self.write_failure(photo, "failed to stage image bytes", e);
        }
        if let Err(e) = self.store.publish_photo(photo.key).await {
            return self.write_failure(photo, "failed to publish image bytes", e);
        }
        Some(true)
    }

    fn write_failure(&self, photo: &PhotoRecord, what: &str, e: StoreError) -> Option<bool> {
        if matches!(e, StoreError::NotFound { .. }) {
            tracing::debug!(photo = %photo.key, "photo deleted mid-download, skipping");
            None
        } else {
            tracing::warn!(photo = %photo.key, error = %e, "{what}");
            Some(false)
        }
    }

    fn claim(&self, pin: PinKey) -> Result<BatchGuard<'_>, SyncError> {
        let mut active = lock_active(&self.active);
        if !active.insert(pin) {
            return Err(SyncError::BatchInFlight { pin });
        }
        Ok(BatchGuard { engine: self, pin })
    }

    fn send(&self, notification: AlbumNotification) {
        // No subscribers is fine.
        let _ = self.notify.send(notification);
    }
}

fn lock_active(active: &Mutex<HashSet<PinKey>>) -> MutexGuard<'_, HashSet<PinKey>> {
    // The set of in-flight pins stays usable even if a holder panicked.
    active.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears the in-flight mark for a pin when its batch ends, by any path.
struct BatchGuard<'a> {
    engine: &'a AlbumSyncEngine,
    pin: PinKey,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        lock_active(&self.engine.active).remove(&self.pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Semaphore;

    use crate::flickr::{PhotoDescriptor, SearchError};
    use crate::store::{Coordinate, StoreError};

    const PLACEHOLDER: &[u8] = b"loading";

    fn descriptors(n: usize) -> Vec<PhotoDescriptor> {
        (0..n)
            .map(|i| PhotoDescriptor {
                title: format!("photo {}", i),
                url: format!("https://example.com/{}.jpg", i),
            })
            .collect()
    }

    /// Pops queued results in order; panics if called more often than
    /// results were queued.
    struct FakeSearch {
        results: Mutex<Vec<Result<Vec<PhotoDescriptor>, SearchError>>>,
        calls: AtomicUsize,
    }

    impl FakeSearch {
        fn new(results: Vec<Result<Vec<PhotoDescriptor>, SearchError>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PhotoSearch for FakeSearch {
        async fn search(
            &self,
            _query: &SearchQuery,
        ) -> Result<Vec<PhotoDescriptor>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.lock().unwrap().remove(0)
        }
    }

    /// Returns the URL bytes as the image, or an HTTP 404 for listed URLs.
    struct FakeFetcher {
        fail_urls: Vec<String>,
    }

    impl FakeFetcher {
        fn ok() -> Self {
            Self { fail_urls: vec![] }
        }

        fn failing(urls: &[&str]) -> Self {
            Self {
                fail_urls: urls.iter().map(|u| u.to_string()).collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            if self.fail_urls.iter().any(|u| u == url) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    code: 404,
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    /// Blocks every fetch until permits are added, to hold a batch open.
    /// Each fetch consumes one permit permanently.
    struct GatedFetcher {
        gate: Arc<Semaphore>,
    }

    #[async_trait::async_trait]
    impl ImageFetcher for GatedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            let permit = self.gate.acquire().await.map_err(|_| FetchError::Status {
                url: url.to_string(),
                code: 500,
            })?;
            permit.forget();
            Ok(url.as_bytes().to_vec())
        }
    }

    fn engine(
        store: Arc<Store>,
        search: Arc<dyn PhotoSearch>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> AlbumSyncEngine {
        let mut config = EngineConfig::new("test-key");
        config.placeholder = PLACEHOLDER.to_vec();
        AlbumSyncEngine::new(store, search, fetcher, config)
    }

    async fn pin_at(store: &Store, lat: f64, lon: f64) -> PinKey {
        store
            .create_pin(Coordinate::new(lat, lon).unwrap())
            .await
            .unwrap()
            .key
    }

    #[tokio::test]
    async fn test_ensure_photos_populates_album() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(3))]));
        let engine = engine(store.clone(), search.clone(), Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;

        let outcome = engine.ensure_photos(pin).await.unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 3,
                failed: 0
            }
        );
        assert_eq!(search.calls(), 1);

        let visible = store.visible_photos(pin).await.unwrap();
        assert_eq!(visible.len(), 3);
        for photo in &visible {
            // Each fake image is its own URL's bytes.
            assert_eq!(photo.image, photo.remote_url.as_ref().unwrap().as_bytes());
        }
    }

    #[tokio::test]
    async fn test_ensure_photos_skips_populated_album() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(3))]));
        let engine = engine(store.clone(), search.clone(), Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;

        engine.ensure_photos(pin).await.unwrap();
        let outcome = engine.ensure_photos(pin).await.unwrap();
        assert_eq!(outcome, BatchOutcome::AlreadyPopulated);
        // Only the first call hit the search service.
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_search_result() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(vec![])]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 0.0, 0.0).await;
        let mut notifications = engine.subscribe();

        let outcome = engine.ensure_photos(pin).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Empty);
        assert_eq!(store.photo_count(pin).await.unwrap(), 0);
        assert_eq!(
            notifications.try_recv().unwrap(),
            AlbumNotification::EmptyResult { pin }
        );
    }

    #[tokio::test]
    async fn test_search_failure_writes_nothing() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Err(SearchError::Status {
            code: 503,
        })]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;
        let mut notifications = engine.subscribe();

        let err = engine.ensure_photos(pin).await.unwrap_err();
        assert!(matches!(err, SyncError::Search(_)));
        assert_eq!(store.photo_count(pin).await.unwrap(), 0);
        match notifications.try_recv().unwrap() {
            AlbumNotification::SearchFailed { pin: p, kind, .. } => {
                assert_eq!(p, pin);
                assert_eq!(kind, SearchErrorKind::Status);
            }
            other => panic!("expected SearchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_batch_can_be_retried() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![
            Err(SearchError::Decode("expected value".into())),
            Ok(descriptors(2)),
        ]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;

        // The in-flight mark is released when the failed batch ends.
        engine.ensure_photos(pin).await.unwrap_err();
        let outcome = engine.ensure_photos(pin).await.unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_partial_download_failure_keeps_placeholder() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(3))]));
        let fetcher = Arc::new(FakeFetcher::failing(&["https://example.com/1.jpg"]));
        let engine = engine(store.clone(), search, fetcher);
        let pin = pin_at(&store, 40.0, -74.0).await;

        let outcome = engine.ensure_photos(pin).await.unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 2,
                failed: 1
            }
        );

        let visible = store.visible_photos(pin).await.unwrap();
        assert_eq!(visible.len(), 3);
        let failed: Vec<_> = visible
            .iter()
            .filter(|p| p.image == PLACEHOLDER)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].remote_url.as_deref(),
            Some("https://example.com/1.jpg")
        );
    }

    #[tokio::test]
    async fn test_batch_complete_sent_exactly_once() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(3))]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;
        let mut notifications = engine.subscribe();

        engine.ensure_photos(pin).await.unwrap();

        let mut completions = 0;
        while let Ok(n) = notifications.try_recv() {
            if matches!(n, AlbumNotification::BatchComplete { .. }) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn test_concurrent_batch_rejected() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(2)), Ok(descriptors(2))]));
        let gate = Arc::new(Semaphore::new(0));
        let engine = Arc::new(engine(
            store.clone(),
            search,
            Arc::new(GatedFetcher { gate: gate.clone() }),
        ));
        let pin = pin_at(&store, 40.0, -74.0).await;

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.ensure_photos(pin).await })
        };

        // Wait until the first batch has published its placeholders and is
        // blocked in the download fan-out.
        loop {
            if store.photo_count(pin).await.unwrap() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let err = engine.refresh_album(pin).await.unwrap_err();
        assert!(matches!(err, SyncError::BatchInFlight { pin: p } if p == pin));

        gate.add_permits(2);
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_replaces_album() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![
            Ok(vec![PhotoDescriptor {
                title: "old".into(),
                url: "https://example.com/old.jpg".into(),
            }]),
            Ok(vec![
                PhotoDescriptor {
                    title: "new a".into(),
                    url: "https://example.com/a.jpg".into(),
                },
                PhotoDescriptor {
                    title: "new b".into(),
                    url: "https://example.com/b.jpg".into(),
                },
            ]),
        ]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;

        engine.ensure_photos(pin).await.unwrap();
        let outcome = engine.refresh_album(pin).await.unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 2,
                failed: 0
            }
        );

        let visible = store.visible_photos(pin).await.unwrap();
        let titles: Vec<_> = visible.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["new a", "new b"]);
    }

    #[tokio::test]
    async fn test_refresh_never_shows_mixed_album() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let old_titles = ["old 0", "old 1", "old 2"];
        let new_titles = ["new a", "new b"];
        let descriptor = |title: &str| PhotoDescriptor {
            title: title.to_string(),
            url: format!("https://example.com/{}.jpg", title.replace(' ', "-")),
        };
        let search = Arc::new(FakeSearch::new(vec![
            Ok(old_titles.iter().map(|t| descriptor(t)).collect()),
            Ok(new_titles.iter().map(|t| descriptor(t)).collect()),
        ]));
        // Three permits let the first batch download; the refresh batch
        // then blocks mid-download until more are added.
        let gate = Arc::new(Semaphore::new(3));
        let engine = Arc::new(engine(
            store.clone(),
            search,
            Arc::new(GatedFetcher { gate: gate.clone() }),
        ));
        let pin = pin_at(&store, 40.0, -74.0).await;
        engine.ensure_photos(pin).await.unwrap();

        let refresh = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.refresh_album(pin).await })
        };

        // Poll the foreground surface across the refresh: every observed
        // snapshot must be entirely the old set, empty, or entirely the
        // new set — never a mix of the two batches.
        loop {
            let titles: Vec<String> = store
                .visible_photos(pin)
                .await
                .unwrap()
                .iter()
                .map(|p| p.title.clone())
                .collect();
            let all_old = titles.len() == old_titles.len()
                && titles.iter().all(|t| old_titles.contains(&t.as_str()));
            let all_new = titles.len() == new_titles.len()
                && titles.iter().all(|t| new_titles.contains(&t.as_str()));
            assert!(
                all_old || all_new || titles.is_empty(),
                "mixed album observed: {:?}",
                titles
            );
            if all_new {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        gate.add_permits(2);
        let outcome = refresh.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 2,
                failed: 0
            }
        );
        let visible = store.visible_photos(pin).await.unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|p| p.image != PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_photo_deleted_mid_download_is_skipped() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(2))]));
        let gate = Arc::new(Semaphore::new(0));
        let engine = Arc::new(engine(
            store.clone(),
            search,
            Arc::new(GatedFetcher { gate: gate.clone() }),
        ));
        let pin = pin_at(&store, 40.0, -74.0).await;
        let mut notifications = engine.subscribe();

        let batch = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.ensure_photos(pin).await })
        };

        loop {
            if store.photo_count(pin).await.unwrap() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        // Delete one placeholder while its download is blocked; the late
        // write must count as neither fetched nor failed.
        let visible = store.visible_photos(pin).await.unwrap();
        store.delete_photo(visible[0].key).await.unwrap();

        gate.add_permits(2);
        let outcome = batch.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Populated {
                fetched: 1,
                failed: 0
            }
        );
        let complete = loop {
            match notifications.try_recv().unwrap() {
                AlbumNotification::BatchComplete { fetched, failed, .. } => {
                    break (fetched, failed)
                }
                _ => continue,
            }
        };
        assert_eq!(complete, (1, 0));
    }

    #[tokio::test]
    async fn test_delete_photo_passthrough() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(2))]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;

        engine.ensure_photos(pin).await.unwrap();
        let visible = store.visible_photos(pin).await.unwrap();
        engine.delete_photo(visible[0].key).await.unwrap();
        assert_eq!(store.visible_photos(pin).await.unwrap().len(), 1);

        let err = engine.delete_photo(visible[0].key).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(StoreError::NotFound { entity: "photo", .. })
        ));
    }

    #[tokio::test]
    async fn test_populated_album_view_end_to_end() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![Ok(descriptors(3))]));
        let engine = engine(store.clone(), search, Arc::new(FakeFetcher::ok()));
        let pin = pin_at(&store, 40.0, -74.0).await;
        let mut notifications = engine.subscribe();

        engine.ensure_photos(pin).await.unwrap();

        let view = crate::album::AlbumView::open(store, pin).await.unwrap();
        let snapshot = view.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot
            .photos
            .windows(2)
            .all(|w| (w[0].created_at, w[0].key) <= (w[1].created_at, w[1].key)));
        assert!(snapshot.photos.iter().all(|p| p.image != PLACEHOLDER));
        assert_eq!(
            notifications.try_recv().unwrap(),
            AlbumNotification::BatchComplete {
                pin,
                fetched: 3,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_missing_pin_rejected() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let search = Arc::new(FakeSearch::new(vec![]));
        let engine = engine(store.clone(), search.clone(), Arc::new(FakeFetcher::ok()));

        let err = engine.ensure_photos(PinKey(99)).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(StoreError::NotFound { entity: "pin", .. })
        ));
        assert_eq!(search.calls(), 0);
    }
}
