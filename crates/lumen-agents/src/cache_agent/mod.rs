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

//! The resource cache service.
//!
//! [`ResourceCache`] owns every cached resource, keyed by source path and
//! partitioned by tag. It exposes five operations to the rest of the game:
//! - [`peek`](ResourceCache::peek): return a resident resource, if any;
//! - [`fetch_or_wait`](ResourceCache::fetch_or_wait): return a resident
//!   resource, or load it, joining any load of the same key already running;
//! - [`put`](ResourceCache::put): install a resource obtained elsewhere;
//! - [`evict_tag`](ResourceCache::evict_tag) and
//!   [`evict_all`](ResourceCache::evict_all): dispose everything under a tag,
//!   or everything at all.
//!
//! All state (the tagged store and the in-flight markers) sits behind one
//! mutex that is never held across an `.await`. Disposal always runs after
//! the entry has left every index, outside the lock.

mod cache;
mod flight;
mod stats;

pub use cache::{FetchOutcome, ResourceCache};
pub use stats::CacheStats;
