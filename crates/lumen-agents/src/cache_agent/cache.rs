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

use super::flight::{self, FlightGuard, FlightReceiver, FlightResult};
use super::stats::{CacheStats, StatsCounters};
use lumen_core::{
    asset::{
        CacheKey, FetchError, Resource, ResourceDecoder, ResourceDisposer, ResourceFetcher,
        ResourceHandle, Tag,
    },
    CancellationToken, Stopwatch,
};
use lumen_data::{
    assets::{RemovalCause, RemovedEntry, TaggedStore},
    CacheConfig,
};
use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// The result of [`ResourceCache::fetch_or_wait`].
#[derive(Debug)]
pub enum FetchOutcome<R: Resource> {
    /// The resource is resident and owned by the cache.
    Loaded(ResourceHandle<R>),
    /// The load failed; nothing was cached and the next call will retry.
    ///
    /// A caller that joined a load abandoned by the caller running it also
    /// gets `Absent`: its own token is still live.
    Absent,
    /// The caller's own token fired before the resource was installed.
    Cancelled,
}

impl<R: Resource> FetchOutcome<R> {
    /// Returns the loaded handle, if any.
    pub fn handle(&self) -> Option<&ResourceHandle<R>> {
        match self {
            FetchOutcome::Loaded(handle) => Some(handle),
            _ => None,
        }
    }

    /// Converts the outcome into the loaded handle, if any.
    pub fn into_handle(self) -> Option<ResourceHandle<R>> {
        match self {
            FetchOutcome::Loaded(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns `true` for [`FetchOutcome::Loaded`].
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded(_))
    }

    /// Returns `true` for [`FetchOutcome::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, FetchOutcome::Absent)
    }

    /// Returns `true` for [`FetchOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchOutcome::Cancelled)
    }
}

/// Everything guarded by the cache's single lock.
pub(super) struct CacheState<R: Resource> {
    pub(super) store: TaggedStore<R>,
    /// Keys with a load running, mapped to the flight waiters subscribe to.
    pub(super) in_flight: HashMap<CacheKey, FlightReceiver<R>>,
}

pub(super) struct Shared<R: Resource> {
    pub(super) state: Mutex<CacheState<R>>,
    fetcher: Box<dyn ResourceFetcher>,
    decoder: Box<dyn ResourceDecoder<R>>,
    disposer: Box<dyn ResourceDisposer<R>>,
    stats: StatsCounters,
}

/// Locks the cache state.
///
/// No user code runs under the lock and every transition leaves both indexes
/// consistent, so a poisoned lock still guards valid state.
pub(super) fn lock_state<R: Resource>(state: &Mutex<CacheState<R>>) -> MutexGuard<'_, CacheState<R>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: Resource> Shared<R> {
    fn dispose_all(&self, removed: Vec<RemovedEntry<R>>) {
        for entry in removed {
            if entry.cause == RemovalCause::Evicted {
                StatsCounters::bump(&self.stats.evictions);
                log::debug!("ResourceCache: evicted {} from tag {}", entry.key, entry.tag);
            }
            self.dispose(&entry.key, &entry.resource);
        }
    }

    fn dispose(&self, key: &CacheKey, resource: &R) {
        StatsCounters::bump(&self.stats.disposals);
        match panic::catch_unwind(AssertUnwindSafe(|| self.disposer.dispose(resource))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                StatsCounters::bump(&self.stats.dispose_faults);
                log::warn!("ResourceCache: failed to dispose {key}: {e}");
            }
            Err(_) => {
                StatsCounters::bump(&self.stats.dispose_faults);
                log::warn!("ResourceCache: disposer panicked while releasing {key}");
            }
        }
    }
}

impl<R: Resource> Drop for Shared<R> {
    fn drop(&mut self) {
        let removed = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .store
            .drain_all();
        if !removed.is_empty() {
            log::debug!(
                "ResourceCache: releasing {} entries on teardown",
                removed.len()
            );
        }
        self.dispose_all(removed);
    }
}

enum Role<R: Resource> {
    Join(FlightReceiver<R>),
    Fetch(FlightGuard<R>, Vec<RemovedEntry<R>>),
}

/// A tagged, capacity-bounded cache of decoded resources.
///
/// The cache is a service: construct it once, clone it into whatever needs it
/// (clones share the same state), and call [`evict_all`](Self::evict_all) on
/// shutdown or under memory pressure. Entries still resident when the last
/// clone is dropped are disposed at that point.
///
/// Handles returned by the cache are non-owning: only the cache ever invokes
/// the disposer, exactly once per entry.
pub struct ResourceCache<R: Resource> {
    shared: Arc<Shared<R>>,
}

impl<R: Resource> Clone for ResourceCache<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: Resource> ResourceCache<R> {
    /// Creates a cache enforcing `config`, loading through `fetcher` and
    /// `decoder`, and releasing resources through `disposer`.
    pub fn new(
        config: CacheConfig,
        fetcher: impl ResourceFetcher + 'static,
        decoder: impl ResourceDecoder<R> + 'static,
        disposer: impl ResourceDisposer<R> + 'static,
    ) -> Self {
        log::info!(
            "ResourceCache: created with {} tag limit(s)",
            config.tag_limits.len()
        );
        let state = CacheState {
            store: TaggedStore::new(config),
            in_flight: HashMap::new(),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                fetcher: Box::new(fetcher),
                decoder: Box::new(decoder),
                disposer: Box::new(disposer),
                stats: StatsCounters::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState<R>> {
        lock_state(&self.shared.state)
    }

    /// Returns the resident resource for `key` and marks it most-recently used.
    ///
    /// Never blocks on a load: a key still in flight is reported absent.
    pub fn peek(&self, key: &CacheKey) -> Option<ResourceHandle<R>> {
        self.state().store.get(key)
    }

    /// Returns `true` if `key` is resident. Does not touch recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state().store.contains(key)
    }

    /// Returns `true` if a load of `key` is running.
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.state().in_flight.contains_key(key)
    }

    /// Returns the resource for `key`, loading it under `tag` if needed.
    ///
    /// - A resident key is returned at once.
    /// - If another caller is already loading `key`, this call waits for that
    ///   load and shares its outcome. Only one fetch per key is ever running.
    /// - Otherwise this call loads it: the tag's limit is enforced first, then
    ///   the key is fetched, decoded and installed at the most-recent position.
    ///
    /// Failures are not cached. If `cancel` fires before the entry is
    /// installed, nothing is installed and `Cancelled` is returned; a waiter
    /// that gives up this way leaves the load running for the others. A
    /// waiter whose load is abandoned by the caller running it sees `Absent`.
    pub async fn fetch_or_wait(
        &self,
        key: impl Into<CacheKey>,
        tag: impl Into<Tag>,
        cancel: &CancellationToken,
    ) -> FetchOutcome<R> {
        let key = key.into();
        let tag = tag.into();
        let stats = &self.shared.stats;

        let role = {
            let mut state = self.state();
            if let Some(handle) = state.store.get(&key) {
                StatsCounters::bump(&stats.hits);
                log::trace!("ResourceCache: hit {key}");
                return FetchOutcome::Loaded(handle);
            }
            StatsCounters::bump(&stats.misses);

            match state.in_flight.get(&key).cloned() {
                Some(receiver) => Role::Join(receiver),
                None => {
                    let (sender, receiver) = flight::open();
                    state.in_flight.insert(key.clone(), receiver);
                    let evicted = state.store.make_room(&tag);
                    let guard = FlightGuard::new(self.shared.clone(), key.clone(), sender);
                    Role::Fetch(guard, evicted)
                }
            }
        };

        match role {
            Role::Join(receiver) => self.join(&key, receiver, cancel).await,
            Role::Fetch(guard, evicted) => {
                self.shared.dispose_all(evicted);
                self.load(key, tag, guard, cancel).await
            }
        }
    }

    async fn join(
        &self,
        key: &CacheKey,
        mut receiver: FlightReceiver<R>,
        cancel: &CancellationToken,
    ) -> FetchOutcome<R> {
        let stats = &self.shared.stats;
        StatsCounters::bump(&stats.joins);
        log::trace!("ResourceCache: joining in-flight load of {key}");

        let settled = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                StatsCounters::bump(&stats.cancellations);
                return FetchOutcome::Cancelled;
            }
            settled = flight::join(&mut receiver) => settled,
        };

        match settled {
            // The entry may have been evicted between installation and wake-up.
            Some(FlightResult::Loaded(_)) => match self.peek(key) {
                Some(handle) => FetchOutcome::Loaded(handle),
                None => FetchOutcome::Absent,
            },
            // Only this caller's own token makes its outcome `Cancelled`.
            Some(FlightResult::Failed | FlightResult::Cancelled) | None => FetchOutcome::Absent,
        }
    }

    async fn load(
        &self,
        key: CacheKey,
        tag: Tag,
        mut guard: FlightGuard<R>,
        cancel: &CancellationToken,
    ) -> FetchOutcome<R> {
        let shared = &self.shared;
        StatsCounters::bump(&shared.stats.fetches);
        let stopwatch = Stopwatch::new();

        let fetched = shared.fetcher.fetch(&key, cancel).await;
        if cancel.is_cancelled() || matches!(&fetched, Err(e) if e.is_cancelled()) {
            return self.abandon(&key, guard);
        }

        let decoded = fetched.and_then(|bytes| {
            shared
                .decoder
                .decode(&bytes)
                .map_err(|e| FetchError::Decode(e.to_string()))
        });
        let resource = match decoded {
            Ok(resource) => resource,
            Err(e) => {
                log::error!("ResourceCache: Failed to load {key}: {e}");
                StatsCounters::bump(&shared.stats.failures);
                guard.settle(FlightResult::Failed);
                return FetchOutcome::Absent;
            }
        };

        let handle = ResourceHandle::new(resource);
        let installed = {
            let mut state = self.state();
            if cancel.is_cancelled() {
                None
            } else {
                let removed = state.store.insert(key.clone(), tag.clone(), handle.clone());
                guard.settle_locked(&mut state, FlightResult::Loaded(handle.clone()));
                Some(removed)
            }
        };

        let Some(removed) = installed else {
            // Decoded but never installed: still ours to release.
            shared.dispose(&key, &handle);
            return self.abandon(&key, guard);
        };
        shared.dispose_all(removed);

        log::debug!(
            "ResourceCache: loaded {key} under {tag} in {:.1}ms",
            stopwatch.elapsed_ms_f64()
        );
        FetchOutcome::Loaded(handle)
    }

    fn abandon(&self, key: &CacheKey, guard: FlightGuard<R>) -> FetchOutcome<R> {
        log::debug!("ResourceCache: load of {key} cancelled");
        StatsCounters::bump(&self.shared.stats.cancellations);
        guard.settle(FlightResult::Cancelled);
        FetchOutcome::Cancelled
    }

    /// Installs `resource` under `key` and `tag`, whatever the cache held before.
    ///
    /// A previous entry for `key` is disposed first, even if it belongs to
    /// another tag; then the tag's limit is enforced. Use this for resources
    /// obtained outside the cache's own fetch path.
    pub fn put(
        &self,
        key: impl Into<CacheKey>,
        tag: impl Into<Tag>,
        resource: R,
    ) -> ResourceHandle<R> {
        let key = key.into();
        let tag = tag.into();
        log::trace!("ResourceCache: put {key} under {tag}");

        let handle = ResourceHandle::new(resource);
        let removed = self.state().store.insert(key, tag, handle.clone());
        self.shared.dispose_all(removed);
        handle
    }

    /// Disposes every entry under `tag`. Returns how many were disposed.
    ///
    /// Loads in flight for this tag are unaffected and will install their
    /// result when they complete.
    pub fn evict_tag(&self, tag: &Tag) -> usize {
        let removed = self.state().store.drain_tag(tag);
        let count = removed.len();
        if count > 0 {
            log::debug!("ResourceCache: cleared {count} entries tagged {tag}");
        }
        self.shared.dispose_all(removed);
        count
    }

    /// Disposes every entry of every tag. Returns how many were disposed.
    pub fn evict_all(&self) -> usize {
        let removed = self.state().store.drain_all();
        let count = removed.len();
        if count > 0 {
            log::debug!("ResourceCache: cleared all {count} entries");
        }
        self.shared.dispose_all(removed);
        count
    }

    /// Disposes every entry whose tag is not in `keep`. Returns how many were disposed.
    pub fn evict_all_except(&self, keep: &[Tag]) -> usize {
        let removed = self.state().store.drain_all_except(keep);
        let count = removed.len();
        if count > 0 {
            log::debug!(
                "ResourceCache: cleared {count} entries outside {} kept tag(s)",
                keep.len()
            );
        }
        self.shared.dispose_all(removed);
        count
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.state().store.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.state().store.is_empty()
    }

    /// Returns the number of resident entries under `tag`.
    pub fn tag_len(&self, tag: &Tag) -> usize {
        self.state().store.tag_len(tag)
    }

    /// Returns the keys under `tag`, least-recently-used first.
    pub fn tag_order(&self, tag: &Tag) -> Vec<CacheKey> {
        self.state().store.tag_order(tag)
    }

    /// Returns the capacity configuration of the cache.
    pub fn config(&self) -> CacheConfig {
        self.state().store.config().clone()
    }

    /// Returns a snapshot of the cache's counters.
    pub fn stats(&self) -> CacheStats {
        let entries = self.len();
        self.shared.stats.snapshot(entries)
    }
}
