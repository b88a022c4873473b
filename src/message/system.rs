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

//! System payload kinds.
//!
//! These are the payloads the framework itself sends: lifecycle requests
//! between supervisors and actors, the subscription protocol, cross-supervisor
//! forwarding, state observation, and the registry and link vocabularies.
//! They ride the same envelopes and the same dispatch as user payloads.

use std::fmt;
use std::sync::Mutex;

use crate::actor::{ActorCell, ActorState};
use crate::address::Address;
use crate::handler::Handler;
use crate::message::{Envelope, Request};
use crate::subscription::SubscriptionPoint;
use std::sync::Arc;

/// Callback attached to an unsubscription, run once the point is fully
/// retired (its confirmation has been delivered and committed).
pub type UnsubscribeDone = Box<dyn FnOnce() + Send>;

// ---------------------------------------------------------------------------
// Actor lifecycle
// ---------------------------------------------------------------------------

/// Sent to a supervisor to hand over a freshly built actor.
///
/// The cell travels inside the message so that actor construction can happen
/// on any thread while all mutation stays on the supervisor's loop.
pub struct CreateActor {
    /// The actor cell, taken exactly once by the receiving supervisor.
    pub(crate) cell: Mutex<Option<ActorCell>>,
    /// The actor's primary address, minted before the handover.
    pub(crate) address: Address,
}

impl fmt::Debug for CreateActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateActor")
            .field("address", &self.address)
            .finish()
    }
}

/// Initialization request from a supervisor to an actor.
#[derive(Debug, Clone)]
pub struct InitRequest {
    /// The actor asked to initialize.
    pub actor_address: Address,
}

/// Confirms successful initialization.
#[derive(Debug)]
pub struct InitConfirmation;

impl Request for InitRequest {
    type Response = InitConfirmation;
}

/// Sent by a supervisor once initialization confirmed; moves the actor to
/// `Operational`.
#[derive(Debug, Clone)]
pub struct StartTrigger {
    /// The actor being started.
    pub actor_address: Address,
}

/// Asks a supervisor to begin the shutdown procedure for one of its actors
/// (or for itself). This is the only public shutdown entry point; the actual
/// `ShutdownRequest` always arrives through the normal queue, never inline.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    /// The actor to shut down.
    pub actor_address: Address,
}

/// Shutdown request from a supervisor to an actor.
#[derive(Debug, Clone)]
pub struct ShutdownRequest {
    /// The actor asked to shut down.
    pub actor_address: Address,
}

/// Confirms completed shutdown.
#[derive(Debug)]
pub struct ShutdownConfirmation;

impl Request for ShutdownRequest {
    type Response = ShutdownConfirmation;
}

// ---------------------------------------------------------------------------
// State observation
// ---------------------------------------------------------------------------

/// Asks a supervisor for the lifecycle state of one of its actors.
#[derive(Debug, Clone)]
pub struct StateQuery {
    /// The actor whose state is being asked for.
    pub subject: Address,
}

/// Response to a [`StateQuery`]. Unknown subjects report
/// [`ActorState::ShutDown`]: an address the supervisor no longer tracks
/// belongs to an actor that has been torn down.
#[derive(Debug)]
pub struct StateReport {
    /// Current lifecycle state of the subject.
    pub state: ActorState,
}

impl Request for StateQuery {
    type Response = StateReport;
}

// ---------------------------------------------------------------------------
// Subscription protocol
// ---------------------------------------------------------------------------

/// Sent by a supervisor to an actor when a subscription on a local address
/// has been recorded.
#[derive(Debug, Clone)]
pub struct SubscriptionConfirmation {
    /// The recorded `(handler, address)` pair.
    pub point: SubscriptionPoint,
}

/// Forwards a subscription whose target address lives on a foreign
/// supervisor; the foreign supervisor records it and confirms back to the
/// owning actor.
#[derive(Debug, Clone)]
pub struct ExternalSubscription {
    /// The point to record remotely.
    pub point: SubscriptionPoint,
}

/// Forwards an unsubscription to the foreign supervisor owning the target
/// address.
#[derive(Debug, Clone)]
pub struct ExternalUnsubscription {
    /// The point to retire remotely.
    pub point: SubscriptionPoint,
}

/// Sent back by the foreign supervisor once it has dropped the point; the
/// local supervisor then issues the [`UnsubscriptionConfirmation`].
#[derive(Debug, Clone)]
pub struct CommitUnsubscription {
    /// The point the foreign supervisor dropped.
    pub point: SubscriptionPoint,
}

/// Sent by a supervisor to an actor when one of its subscription points is
/// being retired. Delivery of this message is also the commit point: the
/// registry entry is removed right after the actor has polled its
/// unsubscription plugins, which is what lets an actor retire its own
/// confirmation handlers last.
pub struct UnsubscriptionConfirmation {
    /// The point being retired.
    pub point: SubscriptionPoint,
    /// Optional completion callback, taken when the point commits.
    pub(crate) on_done: Mutex<Option<UnsubscribeDone>>,
}

impl UnsubscriptionConfirmation {
    pub(crate) fn new(point: SubscriptionPoint, on_done: Option<UnsubscribeDone>) -> Self {
        UnsubscriptionConfirmation {
            point,
            on_done: Mutex::new(on_done),
        }
    }
}

impl fmt::Debug for UnsubscriptionConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsubscriptionConfirmation")
            .field("point", &self.point)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Cross-supervisor forwarding
// ---------------------------------------------------------------------------

/// Wraps a message for a handler whose owning actor lives on a different
/// supervisor than the destination address. The wrapping supervisor enqueues
/// this on the handler's supervisor, which invokes the handler locally.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    /// The original message as it arrived at the address's supervisor.
    pub origin: Envelope,
    /// The handler to invoke on its owning supervisor.
    pub handler: Arc<Handler>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps a service name to an address in the registry.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Unique name of the service.
    pub name: String,
    /// The service address to register.
    pub service: Address,
}

/// Successful registration (no content).
#[derive(Debug)]
pub struct RegistrationResponse;

impl Request for RegistrationRequest {
    type Response = RegistrationResponse;
}

/// Removes a single name from the registry.
#[derive(Debug, Clone)]
pub struct DeregisterService {
    /// The name to remove.
    pub name: String,
}

/// Removes every name mapping to the given service address.
#[derive(Debug, Clone)]
pub struct DeregisterNotify {
    /// The address whose names are removed.
    pub service: Address,
}

/// Looks a service up by name.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    /// The name to look up.
    pub name: String,
}

/// Successful discovery result.
#[derive(Debug)]
pub struct DiscoveryReply {
    /// The address found under the requested name.
    pub service: Address,
}

impl Request for DiscoveryRequest {
    type Response = DiscoveryReply;
}

// ---------------------------------------------------------------------------
// Link protocol
// ---------------------------------------------------------------------------

/// Asks a server actor to accept a link from a client.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// The linking client.
    pub client: Address,
    /// The server being linked to.
    pub server: Address,
}

/// Acknowledges an accepted link.
#[derive(Debug)]
pub struct LinkResponse;

impl Request for LinkRequest {
    type Response = LinkResponse;
}

/// Asks a server to drop an existing link.
#[derive(Debug, Clone)]
pub struct UnlinkRequest {
    /// The server holding the link.
    pub server: Address,
}

/// Notifies that a link has been dropped. Travels both as the response to an
/// [`UnlinkRequest`] and as a standalone message when a shutting-down server
/// unlinks unilaterally after its unlink deadline.
#[derive(Debug, Clone)]
pub struct UnlinkNotify {
    /// The server side of the dropped link.
    pub server: Address,
    /// The client side of the dropped link.
    pub client: Address,
}

impl Request for UnlinkRequest {
    type Response = UnlinkNotify;
}

/// Internal deadline event armed by a shutting-down server with linked
/// clients still outstanding.
#[derive(Debug, Clone)]
pub struct UnlinkDeadline {
    /// The server whose deadline elapsed.
    pub server: Address,
}
