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

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::message::{Envelope, Payload};

/// The sending half of a supervisor's delivery queue.
///
/// Enqueueing is lock-free and valid from any thread; the owning supervisor's
/// task drains the queue in FIFO order.
pub(crate) type DeliverySink = tokio::sync::mpsc::UnboundedSender<Envelope>;

/// The receiving half of a supervisor's delivery queue, owned by its task.
pub(crate) type DeliveryQueue = tokio::sync::mpsc::UnboundedReceiver<Envelope>;

/// Shared connection from addresses back to the supervisor that minted them.
///
/// This is a back-reference, never an ownership edge: a live `SupervisorLink`
/// does not keep the supervisor's task alive, and sends simply fail once the
/// task has terminated.
pub(crate) struct SupervisorLink {
    /// Unique id of the owning supervisor.
    pub(crate) supervisor_id: u64,
    /// Address id of the supervisor's own address.
    pub(crate) supervisor_addr_id: u64,
    /// Entry point into the supervisor's delivery queue.
    pub(crate) sink: DeliverySink,
    /// Counter behind `create_address`; addresses are minted only through it.
    next_address_id: AtomicU64,
}

impl SupervisorLink {
    /// Reserves the supervisor's own address id and returns the link.
    pub(crate) fn new(supervisor_id: u64, sink: DeliverySink) -> Arc<Self> {
        Arc::new(SupervisorLink {
            supervisor_id,
            supervisor_addr_id: 1,
            sink,
            next_address_id: AtomicU64::new(2),
        })
    }

    pub(crate) fn mint(self: &Arc<Self>) -> Address {
        let id = self.next_address_id.fetch_add(1, Ordering::Relaxed);
        Address {
            id,
            link: Arc::clone(self),
        }
    }

    /// The supervisor's own address, reachable from any address it minted.
    pub(crate) fn supervisor_address(self: &Arc<Self>) -> Address {
        Address {
            id: self.supervisor_addr_id,
            link: Arc::clone(self),
        }
    }
}

/// Opaque identity token bound to exactly one supervisor.
///
/// Addresses are created only by supervisors (via
/// [`SupervisorHandle::create_address`](crate::supervisor::SupervisorHandle::create_address)
/// or [`ActorContext::create_address`](crate::actor::ActorContext::create_address)).
/// Cloning is cheap and equality is identity: two clones of the same address
/// compare equal, two addresses minted separately never do.
#[derive(Clone)]
pub struct Address {
    id: u64,
    link: Arc<SupervisorLink>,
}

impl Address {
    /// The unique id of this address.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Id of the supervisor owning this address.
    pub fn supervisor_id(&self) -> u64 {
        self.link.supervisor_id
    }

    /// Sends a payload to this address.
    ///
    /// The message is enqueued on the owning supervisor's delivery queue and
    /// dispatched to every handler subscribed here, in registration order.
    /// Fails only when the owning supervisor has terminated.
    pub fn send<P: Payload>(&self, payload: P) -> Result<(), crate::ErrorKind> {
        self.deliver(Envelope::new(self.clone(), payload))
            .map_err(|_| crate::ErrorKind::DispatchFailed)
    }

    /// Enqueues a pre-built envelope; on failure the envelope is handed back
    /// so callers can synthesize a `dispatch_failed` response from it.
    pub(crate) fn deliver(&self, envelope: Envelope) -> Result<(), Envelope> {
        self.link.sink.send(envelope).map_err(|err| err.0)
    }

    /// Like [`deliver`](Self::deliver) but for fire-and-forget system traffic:
    /// a closed queue is logged and the message dropped.
    pub(crate) fn deliver_or_log(&self, envelope: Envelope) {
        if let Err(dropped) = self.deliver(envelope) {
            warn!(
                address = self.id,
                message = dropped.type_name(),
                "destination supervisor is gone, dropping message"
            );
        }
    }

    /// Address of the supervisor owning this address.
    pub fn supervisor_address(&self) -> Address {
        self.link.supervisor_address()
    }

    pub(crate) fn link(&self) -> &Arc<SupervisorLink> {
        &self.link
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.link.supervisor_id == other.link.supervisor_id
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}@{})", self.id, self.link.supervisor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_link(supervisor_id: u64) -> Arc<SupervisorLink> {
        let (sink, _queue) = tokio::sync::mpsc::unbounded_channel();
        SupervisorLink::new(supervisor_id, sink)
    }

    #[test]
    fn equality_is_identity() {
        let link = test_link(7);
        let a = link.mint();
        let b = link.mint();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn supervisor_address_is_reachable_from_any_address() {
        let link = test_link(7);
        let a = link.mint();
        let sup = a.supervisor_address();
        assert_eq!(sup.id(), 1);
        assert_eq!(sup.supervisor_id(), 7);
        assert_eq!(sup, link.supervisor_address());
    }
}
