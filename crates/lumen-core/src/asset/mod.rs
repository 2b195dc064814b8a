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

//! Provides the foundational traits and primitive types for Lumen's resource cache.
//!
//! This module defines the "common language" for all cache-related operations.
//! It contains the contracts that other crates implement or use, but it has no
//! knowledge of how resources are fetched, decoded, or stored.
//!
//! The key components are:
//! - The [`Resource`] trait: a marker for all types that can live in the cache.
//! - [`CacheKey`] and [`Tag`]: the primary key of an entry and its usage group.
//! - [`ResourceHandle`]: the non-owning reference handed out to callers.
//! - [`ResourceFetcher`], [`ResourceDecoder`] and [`ResourceDisposer`]: the
//!   injected collaborators that move bytes in and release native memory.

mod error;
mod handle;
mod key;
mod source;

pub use error::*;
pub use handle::*;
pub use key::*;
pub use source::*;

/// A marker trait for types that can be held by the resource cache.
///
/// The supertraits enforce the guarantees the cache relies on:
/// - `Send` + `Sync`: a decoded resource is produced on whichever task ran the
///   fetch and is then shared with every waiter of that fetch.
/// - `'static`: the resource does not borrow anything, so it can stay resident
///   for as long as its tag's budget allows.
///
/// # Examples
///
/// ```
/// use lumen_core::asset::Resource;
///
/// // A decoded cover image.
/// struct Cover {
///     // ... fields
/// }
///
/// impl Resource for Cover {}
/// ```
pub trait Resource: Send + Sync + 'static {}
