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

//! Usage counters of the resource cache.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time snapshot of the cache's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// `fetch_or_wait` calls answered from memory.
    pub hits: u64,
    /// `fetch_or_wait` calls that had to load or join a load.
    pub misses: u64,
    /// Misses that joined a load already in flight.
    pub joins: u64,
    /// Underlying fetches issued.
    pub fetches: u64,
    /// Loads that failed to fetch or decode.
    pub failures: u64,
    /// Calls that returned `Cancelled`.
    pub cancellations: u64,
    /// Entries pushed out by a tag's capacity limit.
    pub evictions: u64,
    /// Resources handed to the disposer.
    pub disposals: u64,
    /// Disposals that reported an error or panicked.
    pub dispose_faults: u64,
    /// Entries resident when the snapshot was taken.
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct StatsCounters {
    pub(super) hits: AtomicU64,
    pub(super) misses: AtomicU64,
    pub(super) joins: AtomicU64,
    pub(super) fetches: AtomicU64,
    pub(super) failures: AtomicU64,
    pub(super) cancellations: AtomicU64,
    pub(super) evictions: AtomicU64,
    pub(super) disposals: AtomicU64,
    pub(super) dispose_faults: AtomicU64,
}

impl StatsCounters {
    pub(super) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self, entries: usize) -> CacheStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            hits: read(&self.hits),
            misses: read(&self.misses),
            joins: read(&self.joins),
            fetches: read(&self.fetches),
            failures: read(&self.failures),
            cancellations: read(&self.cancellations),
            evictions: read(&self.evictions),
            disposals: read(&self.disposals),
            dispose_faults: read(&self.dispose_faults),
            entries: entries as u64,
        }
    }
}
