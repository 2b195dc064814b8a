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

use super::Resource;
use std::{ops::Deref, sync::Arc};

/// A thread-safe, non-owning handle to a cached resource.
///
/// Cloning a handle is cheap, as it only increments a reference count and does
/// not duplicate the underlying resource data.
///
/// A handle is a borrow in everything but name: the cache remains the only
/// party allowed to dispose of the resource. Once the entry has been evicted,
/// its native backing may already have been released even though the handle
/// still keeps the Rust-side value alive. Callers must not keep handles across
/// an eviction of the tag they were fetched under.
#[derive(Debug)]
pub struct ResourceHandle<R: Resource>(Arc<R>);

impl<R: Resource> ResourceHandle<R> {
    /// Creates a new `ResourceHandle` that takes ownership of the resource data.
    ///
    /// This is called by the cache when an entry is installed.
    pub fn new(resource: R) -> Self {
        Self(Arc::new(resource))
    }

    /// Returns `true` if both handles point at the same resource instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<R: Resource> Clone for ResourceHandle<R> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<R: Resource> Deref for ResourceHandle<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
