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

//! A tag-partitioned, least-recently-used storage for resource handles.
//!
//! The store keeps two coupled indexes:
//! - `entries`: key -> slot, the single authority on which keys are resident;
//! - `order`: tag -> (stamp -> key), the recency order of each tag.
//!
//! Every slot carries the stamp under which it is filed in its tag's order,
//! so a key present in `entries` always has exactly one record in
//! `order[slot.tag]`. Stamps come from a monotonic clock; the smallest stamp
//! of a tag is its least-recently-used entry.
//!
//! The store never disposes anything. Every operation that drops an entry
//! hands it back as a [`RemovedEntry`] so the caller can release it after the
//! entry is already gone from both indexes.

use crate::config::CacheConfig;
use lumen_core::asset::{CacheKey, Resource, ResourceHandle, Tag};
use std::collections::{BTreeMap, HashMap};

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// A newer resource was installed under the same key.
    Replaced,
    /// The tag was at its limit and this was its least-recently-used entry.
    Evicted,
    /// The entry was cleared explicitly (tag-scoped or global eviction).
    Cleared,
}

/// An entry that has been unindexed and now awaits disposal.
#[derive(Debug)]
pub struct RemovedEntry<R: Resource> {
    /// The key the entry was stored under.
    pub key: CacheKey,
    /// The tag the entry belonged to.
    pub tag: Tag,
    /// The resource to release.
    pub resource: ResourceHandle<R>,
    /// Why the entry was removed.
    pub cause: RemovalCause,
}

struct Slot<R: Resource> {
    tag: Tag,
    resource: ResourceHandle<R>,
    stamp: u64,
}

/// The in-memory index of every resident resource, partitioned by tag.
pub struct TaggedStore<R: Resource> {
    config: CacheConfig,
    entries: HashMap<CacheKey, Slot<R>>,
    order: HashMap<Tag, BTreeMap<u64, CacheKey>>,
    clock: u64,
}

impl<R: Resource> TaggedStore<R> {
    /// Creates an empty store that enforces the limits of `config`.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            order: HashMap::new(),
            clock: 0,
        }
    }

    /// Returns the capacity configuration of the store.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Returns the resource stored under `key` and marks it most-recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<ResourceHandle<R>> {
        let stamp = self.tick();
        let slot = self.entries.get_mut(key)?;
        let order = self.order.entry(slot.tag.clone()).or_default();
        order.remove(&slot.stamp);
        order.insert(stamp, key.clone());
        slot.stamp = stamp;
        Some(slot.resource.clone())
    }

    /// Returns `true` if a resource is stored under `key`. Does not touch recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the tag `key` is stored under, if it is resident.
    pub fn tag_of(&self, key: &CacheKey) -> Option<&Tag> {
        self.entries.get(key).map(|slot| &slot.tag)
    }

    /// Installs `resource` under `key` and `tag` at the most-recent position.
    ///
    /// Any previous entry for `key` is removed first, whatever its tag. The
    /// tag's limit is then enforced against the remaining entries, so after
    /// the insertion the tag holds at most `max(limit, 1)` entries.
    ///
    /// Returns every entry this call pushed out, for the caller to dispose.
    pub fn insert(
        &mut self,
        key: CacheKey,
        tag: Tag,
        resource: ResourceHandle<R>,
    ) -> Vec<RemovedEntry<R>> {
        let mut removed = Vec::new();
        if let Some(previous) = self.remove_with(&key, RemovalCause::Replaced) {
            removed.push(previous);
        }
        removed.extend(self.make_room(&tag));

        let stamp = self.tick();
        self.order
            .entry(tag.clone())
            .or_default()
            .insert(stamp, key.clone());
        self.entries.insert(
            key,
            Slot {
                tag,
                resource,
                stamp,
            },
        );
        removed
    }

    /// Evicts least-recently-used entries of `tag` until one more fits.
    ///
    /// Does nothing for unbounded tags. For a limit of zero the tag is emptied.
    pub fn make_room(&mut self, tag: &Tag) -> Vec<RemovedEntry<R>> {
        let mut removed = Vec::new();
        let Some(limit) = self.config.limit_for(tag) else {
            return removed;
        };
        let Some(order) = self.order.get_mut(tag) else {
            return removed;
        };

        while order.len() >= limit {
            let Some((_, key)) = order.pop_first() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&key) {
                removed.push(RemovedEntry {
                    key,
                    tag: slot.tag,
                    resource: slot.resource,
                    cause: RemovalCause::Evicted,
                });
            }
        }
        removed
    }

    /// Removes the entry stored under `key`, if any.
    pub fn remove(&mut self, key: &CacheKey) -> Option<RemovedEntry<R>> {
        self.remove_with(key, RemovalCause::Cleared)
    }

    fn remove_with(&mut self, key: &CacheKey, cause: RemovalCause) -> Option<RemovedEntry<R>> {
        let (key, slot) = self.entries.remove_entry(key)?;
        if let Some(order) = self.order.get_mut(&slot.tag) {
            order.remove(&slot.stamp);
        }
        Some(RemovedEntry {
            key,
            tag: slot.tag,
            resource: slot.resource,
            cause,
        })
    }

    /// Removes every entry of `tag` and resets its recency order.
    ///
    /// Entries are returned least-recently-used first.
    pub fn drain_tag(&mut self, tag: &Tag) -> Vec<RemovedEntry<R>> {
        let Some(order) = self.order.remove(tag) else {
            return Vec::new();
        };
        order
            .into_values()
            .filter_map(|key| {
                let slot = self.entries.remove(&key)?;
                Some(RemovedEntry {
                    key,
                    tag: slot.tag,
                    resource: slot.resource,
                    cause: RemovalCause::Cleared,
                })
            })
            .collect()
    }

    /// Removes every entry of every tag.
    pub fn drain_all(&mut self) -> Vec<RemovedEntry<R>> {
        let tags: Vec<Tag> = self.order.keys().cloned().collect();
        let removed = tags.iter().flat_map(|tag| self.drain_tag(tag)).collect();
        self.order.clear();
        self.entries.clear();
        removed
    }

    /// Removes every entry whose tag is not listed in `keep`.
    pub fn drain_all_except(&mut self, keep: &[Tag]) -> Vec<RemovedEntry<R>> {
        let tags: Vec<Tag> = self
            .order
            .keys()
            .filter(|tag| !keep.contains(tag))
            .cloned()
            .collect();
        tags.iter().flat_map(|tag| self.drain_tag(tag)).collect()
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of resident entries under `tag`.
    pub fn tag_len(&self, tag: &Tag) -> usize {
        self.order.get(tag).map_or(0, BTreeMap::len)
    }

    /// Returns the keys of `tag`, least-recently-used first.
    pub fn tag_order(&self, tag: &Tag) -> Vec<CacheKey> {
        self.order
            .get(tag)
            .map(|order| order.values().cloned().collect())
            .unwrap_or_default()
    }
}
