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

//! Single-flight coordination of concurrent loads of the same key.
//!
//! The first caller to miss on a key becomes its fetcher and registers a
//! flight: a watch channel whose value moves from `None` to the load's result
//! exactly once. Later callers subscribe to that channel instead of issuing a
//! second fetch.

use super::cache::{lock_state, CacheState, Shared};
use lumen_core::asset::{CacheKey, Resource, ResourceHandle};
use std::sync::Arc;
use tokio::sync::watch;

/// How a flight ended, as seen by the callers that joined it.
pub(super) enum FlightResult<R: Resource> {
    Loaded(ResourceHandle<R>),
    Failed,
    Cancelled,
}

impl<R: Resource> Clone for FlightResult<R> {
    fn clone(&self) -> Self {
        match self {
            FlightResult::Loaded(handle) => FlightResult::Loaded(handle.clone()),
            FlightResult::Failed => FlightResult::Failed,
            FlightResult::Cancelled => FlightResult::Cancelled,
        }
    }
}

pub(super) type FlightReceiver<R> = watch::Receiver<Option<FlightResult<R>>>;
type FlightSender<R> = watch::Sender<Option<FlightResult<R>>>;

/// Opens a new, unsettled flight.
pub(super) fn open<R: Resource>() -> (FlightSender<R>, FlightReceiver<R>) {
    watch::channel(None)
}

/// Suspends until the flight settles.
///
/// Returns `None` only if the fetcher vanished without settling, which the
/// guard below rules out.
pub(super) async fn join<R: Resource>(receiver: &mut FlightReceiver<R>) -> Option<FlightResult<R>> {
    receiver
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|slot| (*slot).clone())
}

/// Held by the fetcher for the lifetime of its load.
///
/// Settling removes the in-flight marker and publishes the result in one step
/// under the state lock. If the fetcher's future is dropped before settling,
/// the guard settles the flight as cancelled so no waiter is left hanging and
/// the key can be fetched again.
pub(super) struct FlightGuard<R: Resource> {
    shared: Arc<Shared<R>>,
    key: CacheKey,
    sender: Option<FlightSender<R>>,
}

impl<R: Resource> FlightGuard<R> {
    pub(super) fn new(shared: Arc<Shared<R>>, key: CacheKey, sender: FlightSender<R>) -> Self {
        Self {
            shared,
            key,
            sender: Some(sender),
        }
    }

    /// Settles the flight, taking the state lock.
    pub(super) fn settle(mut self, result: FlightResult<R>) {
        let shared = self.shared.clone();
        let mut state = lock_state(&shared.state);
        self.settle_locked(&mut state, result);
    }

    /// Settles the flight while the caller already holds the state lock.
    pub(super) fn settle_locked(&mut self, state: &mut CacheState<R>, result: FlightResult<R>) {
        if let Some(sender) = self.sender.take() {
            state.in_flight.remove(&self.key);
            sender.send_replace(Some(result));
        }
    }
}

impl<R: Resource> Drop for FlightGuard<R> {
    fn drop(&mut self) {
        if self.sender.is_none() {
            return;
        }
        log::debug!("ResourceCache: load of {} abandoned by its fetcher", self.key);
        let shared = self.shared.clone();
        let mut state = lock_state(&shared.state);
        self.settle_locked(&mut state, FlightResult::Cancelled);
    }
}
