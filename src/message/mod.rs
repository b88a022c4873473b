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

//! Message typing and the envelope that carries payloads between actors.
//!
//! A message is `{ destination address, payload of some kind }`. Payload kinds
//! are ordinary user record types; the envelope erases them behind
//! [`Payload`] and dispatch recovers them by [`TypeId`] tag at the handler
//! boundary. Envelopes are immutable after construction and shared by
//! reference count: after enqueueing, the sender holds no observable
//! reference.

use std::any::{Any, TypeId};
use std::sync::Arc;

use static_assertions::assert_impl_all;

use crate::address::Address;

mod request;
mod system;

pub use request::{Request, RequestEnvelope, RequestId, ResponseEnvelope};
pub use system::{
    CommitUnsubscription, CreateActor, DeregisterNotify, DeregisterService, DiscoveryReply,
    DiscoveryRequest, ExternalSubscription, ExternalUnsubscription, HandlerCall, InitConfirmation,
    InitRequest, LinkRequest, LinkResponse, RegistrationRequest, RegistrationResponse,
    ShutdownConfirmation, ShutdownRequest, ShutdownTrigger, StartTrigger, StateQuery, StateReport,
    SubscriptionConfirmation, UnlinkDeadline, UnlinkNotify, UnlinkRequest, UnsubscribeDone,
    UnsubscriptionConfirmation,
};

/// Marker trait for everything that can travel as a message payload.
///
/// Blanket-implemented for every `'static + Send + Sync + Debug` type, so a
/// plain record struct is a payload kind with no ceremony. The `as_any`
/// accessor is what lets dispatch downcast the erased payload back to its
/// concrete kind.
pub trait Payload: Any + Send + Sync + std::fmt::Debug {
    /// Returns the payload as `Any` for tag-checked downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T> Payload for T
where
    T: Any + Send + Sync + std::fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An immutable message envelope: a destination address plus a shared payload.
#[derive(Clone)]
pub struct Envelope {
    /// Where the message is going; dispatch fans out to every handler
    /// subscribed on this address.
    destination: Address,
    /// The type-erased payload.
    payload: Arc<dyn Payload>,
    /// Cached payload tag, checked before any handler runs.
    tag: TypeId,
    /// Payload type name, for logs only.
    type_name: &'static str,
}

impl Envelope {
    /// Wraps a payload for delivery to `destination`.
    pub fn new<P: Payload>(destination: Address, payload: P) -> Self {
        Envelope {
            destination,
            tag: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            payload: Arc::new(payload),
        }
    }

    /// The destination address.
    pub fn destination(&self) -> &Address {
        &self.destination
    }

    /// The payload tag used to discriminate dispatch.
    pub fn tag(&self) -> TypeId {
        self.tag
    }

    /// Payload type name, for logging.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcasts the payload to a concrete kind. Returns `None` on tag
    /// mismatch; dispatch never hands a handler a mismatched envelope.
    pub fn payload_as<P: Payload>(&self) -> Option<&P> {
        self.payload.as_any().downcast_ref::<P>()
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("destination", &self.destination)
            .field("payload", &self.type_name)
            .finish()
    }
}

assert_impl_all!(Envelope: Send, Sync);
