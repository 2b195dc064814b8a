// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use async_trait::async_trait;
use lumen_agents::{FetchOutcome, ResourceCache};
use lumen_core::{
    asset::{CacheKey, DisposeError, FetchError, Resource, ResourceFetcher, ResourceHandle, Tag},
    CancellationToken,
};
use lumen_data::{assets::Sprite, CacheConfig};
use lumen_io::{FileFetcher, SpriteDecoder};
use std::{
    error::Error,
    future::{poll_fn, Future},
    pin::{pin, Pin},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::Poll,
    time::Duration,
};
use tempfile::tempdir;
use tokio::sync::watch;

// --- Test Setup: a string resource, a gated fetcher and a recording disposer ---
#[derive(Debug, PartialEq)]
struct Blob(String);
impl Resource for Blob {}

impl Blob {
    fn name(&self) -> &str {
        &self.0
    }
}

/// Holds every fetch until the gate opens. Keys ending in "fail" answer 404.
struct GatedFetcher {
    calls: AtomicUsize,
    gate: watch::Receiver<bool>,
    honor_cancel: bool,
}

impl GatedFetcher {
    fn new(gate: watch::Receiver<bool>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate,
            honor_cancel: false,
        })
    }

    fn cancellable(gate: watch::Receiver<bool>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate,
            honor_cancel: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for GatedFetcher {
    async fn fetch(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.clone();
        if self.honor_cancel {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = gate.wait_for(|open| *open) => {}
            }
        } else {
            let _ = gate.wait_for(|open| *open).await;
        }

        if key.as_str().ends_with("fail") {
            Err(FetchError::Http {
                url: key.to_string(),
                status: 404,
            })
        } else {
            Ok(key.as_str().as_bytes().to_vec())
        }
    }
}

fn decode_blob(bytes: &[u8]) -> Result<Blob, Box<dyn Error + Send + Sync>> {
    Ok(Blob(String::from_utf8(bytes.to_vec())?))
}

type Disposed = Arc<Mutex<Vec<String>>>;

fn build_cache(config: CacheConfig, fetcher: Arc<GatedFetcher>) -> (ResourceCache<Blob>, Disposed) {
    let disposed: Disposed = Arc::new(Mutex::new(Vec::new()));
    let sink = disposed.clone();
    let disposer = move |blob: &Blob| -> Result<(), DisposeError> {
        sink.lock().unwrap().push(blob.0.clone());
        Ok(())
    };
    (
        ResourceCache::new(config, fetcher, decode_blob, disposer),
        disposed,
    )
}

/// A cache whose fetches complete immediately.
fn open_cache(config: CacheConfig) -> (ResourceCache<Blob>, Arc<GatedFetcher>, Disposed) {
    let (_gate, rx) = watch::channel(true);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(config, fetcher.clone());
    (cache, fetcher, disposed)
}

fn avatar_limit(limit: i64) -> CacheConfig {
    CacheConfig::unbounded().with_limit(Tag::AVATAR, limit)
}

fn key(name: &str) -> CacheKey {
    CacheKey::from(name)
}

fn blob(name: &str) -> Blob {
    Blob(name.to_string())
}

/// Yields until `joins` callers are parked on a flight, then opens the gate.
async fn open_after_joins(cache: &ResourceCache<Blob>, joins: u64, gate: &watch::Sender<bool>) {
    while cache.stats().joins < joins {
        tokio::task::yield_now().await;
    }
    gate.send_replace(true);
}
/// Polls `future` exactly once from the current task.
async fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    poll_fn(|cx| Poll::Ready(Pin::new(&mut *future).poll(cx))).await
}
// ---

#[tokio::test]
async fn test_concurrent_fetches_issue_one_fetch() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, _) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let (first, second, ()) = tokio::join!(
        cache.fetch_or_wait("x", "T", &token),
        cache.fetch_or_wait("x", "T", &token),
        open_after_joins(&cache, 1, &gate),
    );

    let first = first.into_handle().expect("first caller should load");
    let second = second.into_handle().expect("second caller should share the load");
    assert!(ResourceHandle::ptr_eq(&first, &second));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.len(), 1);

    let stats = cache.stats();
    assert_eq!((stats.misses, stats.joins, stats.fetches), (2, 1, 1));
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let (cache, fetcher, _) = open_cache(CacheConfig::unbounded());
    let token = CancellationToken::new();

    let outcome = cache.fetch_or_wait("yfail", "T", &token).await;
    assert!(outcome.is_absent());
    assert!(cache.peek(&key("yfail")).is_none());
    assert!(!cache.is_loading(&key("yfail")));

    let retry = cache.fetch_or_wait("yfail", "T", &token).await;
    assert!(retry.is_absent());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.stats().failures, 2);
}

#[tokio::test]
async fn test_waiters_share_a_failure() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, _) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let (first, second, ()) = tokio::join!(
        cache.fetch_or_wait("yfail", "T", &token),
        cache.fetch_or_wait("yfail", "T", &token),
        open_after_joins(&cache, 1, &gate),
    );

    assert!(first.is_absent());
    assert!(second.is_absent());
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_limit_evicts_least_recent() {
    let (cache, _, disposed) = open_cache(avatar_limit(2));
    let avatar = Tag::new(Tag::AVATAR);

    cache.put("A", Tag::AVATAR, blob("A"));
    cache.put("B", Tag::AVATAR, blob("B"));
    cache.put("C", Tag::AVATAR, blob("C"));

    assert!(cache.peek(&key("A")).is_none());
    assert_eq!(cache.tag_order(&avatar), vec![key("B"), key("C")]);
    assert_eq!(*disposed.lock().unwrap(), vec!["A"]);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_peek_promotes_entry() {
    let (cache, _, disposed) = open_cache(avatar_limit(2));
    let avatar = Tag::new(Tag::AVATAR);
    for name in ["A", "B", "C"] {
        cache.put(name, Tag::AVATAR, blob(name));
    }

    assert!(cache.peek(&key("B")).is_some());
    cache.put("D", Tag::AVATAR, blob("D"));

    assert_eq!(cache.tag_order(&avatar), vec![key("B"), key("D")]);
    assert_eq!(*disposed.lock().unwrap(), vec!["A", "C"]);
}

#[tokio::test]
async fn test_fetch_respects_tag_limit() {
    let (cache, _, disposed) = open_cache(avatar_limit(2));
    let token = CancellationToken::new();
    for name in ["A", "B", "C"] {
        assert!(cache.fetch_or_wait(name, Tag::AVATAR, &token).await.is_loaded());
    }

    assert_eq!(cache.tag_len(&Tag::new(Tag::AVATAR)), 2);
    assert_eq!(*disposed.lock().unwrap(), vec!["A"]);
}

#[tokio::test]
async fn test_concurrent_loads_never_overflow_a_tag() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(avatar_limit(1), fetcher.clone());
    let token = CancellationToken::new();

    let (a, b, ()) = tokio::join!(
        cache.fetch_or_wait("a", Tag::AVATAR, &token),
        cache.fetch_or_wait("b", Tag::AVATAR, &token),
        async {
            gate.send_replace(true);
        },
    );

    assert!(a.is_loaded() && b.is_loaded());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.tag_len(&Tag::new(Tag::AVATAR)), 1);
    assert_eq!(disposed.lock().unwrap().len(), 1);
}

#[test]
fn test_evict_tag_disposes_exactly_once() {
    let (cache, _, disposed) = open_cache(CacheConfig::unbounded());
    cache.put("a1", Tag::AVATAR, blob("a1"));
    cache.put("a2", Tag::AVATAR, blob("a2"));
    cache.put("cover", Tag::GAME_COVER, blob("cover"));

    assert_eq!(cache.evict_tag(&Tag::new(Tag::AVATAR)), 2);

    assert!(cache.peek(&key("a1")).is_none());
    assert!(cache.peek(&key("a2")).is_none());
    assert!(cache.peek(&key("cover")).is_some());
    let mut released = disposed.lock().unwrap().clone();
    released.sort();
    assert_eq!(released, vec!["a1", "a2"]);

    assert_eq!(cache.evict_tag(&Tag::new(Tag::AVATAR)), 0);
    assert_eq!(disposed.lock().unwrap().len(), 2);
}

#[test]
fn test_evict_all_is_idempotent() {
    let (cache, _, disposed) = open_cache(CacheConfig::default());
    cache.put("a", Tag::AVATAR, blob("a"));
    cache.put("b", Tag::GAME_COVER, blob("b"));

    assert_eq!(cache.evict_all(), 2);
    assert_eq!(cache.evict_all(), 0);

    assert!(cache.is_empty());
    assert_eq!(disposed.lock().unwrap().len(), 2);
    assert_eq!(cache.stats().disposals, 2);
}

#[test]
fn test_evict_all_except_keeps_player_avatar() {
    let (cache, _, disposed) = open_cache(CacheConfig::default());
    cache.put("me", Tag::PLAYER_AVATAR, blob("me"));
    cache.put("them", Tag::AVATAR, blob("them"));
    cache.put("cover", Tag::GAME_COVER, blob("cover"));

    let removed = cache.evict_all_except(&[Tag::new(Tag::PLAYER_AVATAR)]);

    assert_eq!(removed, 2);
    assert!(cache.peek(&key("me")).is_some());
    assert_eq!(cache.len(), 1);
    assert_eq!(disposed.lock().unwrap().len(), 2);
}

#[test]
fn test_put_moves_key_across_tags() {
    let (cache, _, disposed) = open_cache(CacheConfig::unbounded());
    cache.put("k", Tag::AVATAR, blob("old"));
    let handle = cache.put("k", Tag::GAME_COVER, blob("new"));

    assert_eq!(handle.name(), "new");
    assert_eq!(cache.tag_len(&Tag::new(Tag::AVATAR)), 0);
    assert_eq!(cache.tag_len(&Tag::new(Tag::GAME_COVER)), 1);
    assert_eq!(*disposed.lock().unwrap(), vec!["old"]);
}

#[test]
fn test_non_positive_limit_keeps_latest_only() {
    let (cache, _, disposed) = open_cache(avatar_limit(0));
    cache.put("a", Tag::AVATAR, blob("a"));
    cache.put("b", Tag::AVATAR, blob("b"));

    assert_eq!(cache.tag_order(&Tag::new(Tag::AVATAR)), vec![key("b")]);
    assert_eq!(*disposed.lock().unwrap(), vec!["a"]);
}

#[tokio::test]
async fn test_cancelled_waiter_leaves_load_running() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, _) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let loader_token = CancellationToken::new();
    let waiter_token = CancellationToken::new();

    let (loaded, waited, ()) = tokio::join!(
        cache.fetch_or_wait("x", "T", &loader_token),
        cache.fetch_or_wait("x", "T", &waiter_token),
        async {
            while cache.stats().joins < 1 {
                tokio::task::yield_now().await;
            }
            waiter_token.cancel();
            assert!(cache.is_loading(&key("x")));
            gate.send_replace(true);
        },
    );

    assert!(waited.is_cancelled());
    assert!(loaded.is_loaded());
    assert!(cache.peek(&key("x")).is_some());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_loader_installs_nothing() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let loader_token = CancellationToken::new();
    let waiter_token = CancellationToken::new();

    let (loaded, waited, ()) = tokio::join!(
        cache.fetch_or_wait("x", "T", &loader_token),
        cache.fetch_or_wait("x", "T", &waiter_token),
        async {
            while cache.stats().joins < 1 {
                tokio::task::yield_now().await;
            }
            loader_token.cancel();
            gate.send_replace(true);
        },
    );

    assert!(loaded.is_cancelled());
    assert!(waited.is_absent());
    assert!(!cache.contains(&key("x")));
    assert!(!cache.is_loading(&key("x")));
    assert!(disposed.lock().unwrap().is_empty());

    let retry = cache
        .fetch_or_wait("x", "T", &CancellationToken::new())
        .await;
    assert!(retry.is_loaded());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_fetcher_honoring_cancellation() {
    let (_gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::cancellable(rx);
    let (cache, _) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let loader_token = CancellationToken::new();
    let waiter_token = CancellationToken::new();

    let (loaded, waited, ()) = tokio::join!(
        cache.fetch_or_wait("x", "T", &loader_token),
        cache.fetch_or_wait("x", "T", &waiter_token),
        async {
            while cache.stats().joins < 1 {
                tokio::task::yield_now().await;
            }
            loader_token.cancel();
        },
    );

    assert!(loaded.is_cancelled());
    assert!(waited.is_absent());
    assert!(!cache.is_loading(&key("x")));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.stats().cancellations, 1);
}

#[tokio::test]
async fn test_dropped_load_frees_the_key() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, _) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        cache.fetch_or_wait("x", "T", &token),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!cache.is_loading(&key("x")));

    gate.send_replace(true);
    let outcome = cache.fetch_or_wait("x", "T", &token).await;
    assert!(outcome.is_loaded());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_load_completing_after_evict_tag_is_installed() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let (outcome, ()) = tokio::join!(cache.fetch_or_wait("x", "T", &token), async {
        cache.put("y", "T", blob("y"));
        assert_eq!(cache.evict_tag(&Tag::new("T")), 1);
        gate.send_replace(true);
    });

    assert!(outcome.is_loaded());
    assert_eq!(cache.tag_order(&Tag::new("T")), vec![key("x")]);
    assert_eq!(*disposed.lock().unwrap(), vec!["y"]);
}

#[tokio::test]
async fn test_hits_are_counted() {
    let (cache, fetcher, _) = open_cache(CacheConfig::unbounded());
    let token = CancellationToken::new();

    for _ in 0..3 {
        let outcome = cache.fetch_or_wait("x", "T", &token).await;
        assert!(matches!(outcome, FetchOutcome::Loaded(ref blob) if blob.name() == "x"));
    }

    let stats = cache.stats();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!((stats.hits, stats.misses), (2, 1));
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_sprites_load_from_disk() -> Result<()> {
    let dir = tempdir()?;
    let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 128, 255, 255]));
    img.save(dir.path().join("cover.png"))?;

    let disposals = Arc::new(AtomicUsize::new(0));
    let counter = disposals.clone();
    let cache: ResourceCache<Sprite> = ResourceCache::new(
        CacheConfig::default(),
        FileFetcher::with_root(dir.path()),
        SpriteDecoder::new(),
        move |_: &Sprite| -> Result<(), DisposeError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );
    let token = CancellationToken::new();

    let sprite = cache
        .fetch_or_wait("cover.png", Tag::LOCAL_LEVEL_COVER_THUMBNAIL, &token)
        .await
        .into_handle()
        .expect("cover should decode");
    assert_eq!((sprite.width, sprite.height), (8, 4));

    let missing = cache
        .fetch_or_wait("missing.png", Tag::LOCAL_LEVEL_COVER_THUMBNAIL, &token)
        .await;
    assert!(missing.is_absent());

    drop(cache);
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_waiter_sees_absent_when_entry_evicted_before_wakeup() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let mut loader = pin!(cache.fetch_or_wait("x", "T", &token));
    let mut waiter = pin!(cache.fetch_or_wait("x", "T", &token));
    assert!(poll_once(&mut loader).await.is_pending());
    assert!(poll_once(&mut waiter).await.is_pending());
    assert_eq!(cache.stats().joins, 1);

    gate.send_replace(true);
    assert!(loader.await.is_loaded());
    assert_eq!(cache.evict_tag(&Tag::new("T")), 1);

    assert!(waiter.await.is_absent());
    assert_eq!(*disposed.lock().unwrap(), vec!["x"]);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_waiter_gets_the_entry_resident_at_wakeup() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let mut loader = pin!(cache.fetch_or_wait("x", "T", &token));
    let mut waiter = pin!(cache.fetch_or_wait("x", "T", &token));
    assert!(poll_once(&mut loader).await.is_pending());
    assert!(poll_once(&mut waiter).await.is_pending());

    gate.send_replace(true);
    let fetched = loader.await.into_handle().expect("loader should install x");
    let replacement = cache.put("x", "T", blob("replacement"));

    let woke = waiter.await.into_handle().expect("x is still resident");
    assert!(ResourceHandle::ptr_eq(&woke, &replacement));
    assert!(!ResourceHandle::ptr_eq(&woke, &fetched));
    assert_eq!(*disposed.lock().unwrap(), vec!["x"]);
}

#[tokio::test]
async fn test_put_during_load_is_replaced_by_the_load() {
    let (gate, rx) = watch::channel(false);
    let fetcher = GatedFetcher::new(rx);
    let (cache, disposed) = build_cache(CacheConfig::unbounded(), fetcher.clone());
    let token = CancellationToken::new();

    let mut loader = pin!(cache.fetch_or_wait("x", "T", &token));
    assert!(poll_once(&mut loader).await.is_pending());

    cache.put("x", "T", blob("manual"));
    let manual = cache.peek(&key("x")).expect("put should install x");
    assert_eq!(manual.name(), "manual");

    gate.send_replace(true);
    let loaded = loader.await.into_handle().expect("load should complete");

    assert_eq!(loaded.name(), "x");
    let resident = cache.peek(&key("x")).expect("x should be resident");
    assert!(ResourceHandle::ptr_eq(&resident, &loaded));
    assert_eq!(cache.tag_len(&Tag::new("T")), 1);
    assert_eq!(*disposed.lock().unwrap(), vec!["manual"]);
}
