/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Subscription points and the per-supervisor registration table.
//!
//! The set of points is a multiset: subscribing the same handler to the same
//! address twice records two entries, and each unsubscription retires exactly
//! one. Per address, handlers keep registration order, which is also the
//! order they receive each message in.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::address::Address;
use crate::handler::Handler;

/// A `(handler, address)` pair installed in the registry.
#[derive(Debug, Clone)]
pub struct SubscriptionPoint {
    /// The subscribed handler.
    pub handler: Arc<Handler>,
    /// The address it is subscribed on.
    pub address: Address,
}

impl SubscriptionPoint {
    /// Creates a point for `handler` on `address`.
    pub fn new(handler: Arc<Handler>, address: Address) -> Self {
        SubscriptionPoint { handler, address }
    }

    /// Key identifying this exact handler/address pairing. Handler identity
    /// is pointer identity: two subscriptions of the same `Arc` are the same
    /// point (counted twice in the multiset), a re-created handler is not.
    pub(crate) fn key(&self) -> PointKey {
        (Arc::as_ptr(&self.handler) as usize, self.address.id())
    }
}

impl PartialEq for SubscriptionPoint {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SubscriptionPoint {}

pub(crate) type PointKey = (usize, u64);

/// Address-keyed handler table owned by one supervisor and touched only from
/// its loop.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    entries: HashMap<u64, Vec<Arc<Handler>>>,
}

impl SubscriptionTable {
    /// Records a point. Duplicates are permitted; each records once.
    pub(crate) fn insert(&mut self, point: &SubscriptionPoint) {
        self.entries
            .entry(point.address.id())
            .or_default()
            .push(Arc::clone(&point.handler));
    }

    /// Removes one occurrence of the point, oldest first.
    pub(crate) fn remove(&mut self, point: &SubscriptionPoint) {
        if let Some(handlers) = self.entries.get_mut(&point.address.id()) {
            if let Some(index) = handlers
                .iter()
                .position(|h| Arc::ptr_eq(h, &point.handler))
            {
                handlers.remove(index);
            }
            if handlers.is_empty() {
                self.entries.remove(&point.address.id());
            }
        }
    }

    /// Snapshot of the handlers for `address` accepting `tag`, in
    /// registration order. A snapshot is taken per message so handlers may
    /// mutate the table while the message is being fanned out.
    pub(crate) fn matching(&self, address: u64, tag: TypeId) -> Vec<Arc<Handler>> {
        self.entries
            .get(&address)
            .map(|handlers| {
                handlers
                    .iter()
                    .filter(|h| h.message_type() == tag)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count of registered handlers across all addresses.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
