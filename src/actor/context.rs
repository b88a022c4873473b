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

//! The API an actor sees from inside its handlers and hooks.

use std::sync::Arc;
use std::time::Duration;

use crate::actor::{Actor, ActorBase, ActorState};
use crate::address::Address;
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{
    LinkRequest, Payload, Request, RequestEnvelope, RequestId, ResponseEnvelope, UnlinkRequest,
    UnsubscribeDone,
};
use crate::subscription::SubscriptionPoint;
use crate::supervisor::SupervisorCore;

/// Borrowed view of an actor's framework state and its supervisor's core,
/// handed to every handler and lifecycle hook.
///
/// A handler may only touch state reachable from its owning actor; the
/// context is that reach. All operations take effect through the message
/// queue: nothing a context does is observed by another actor before the
/// current delivery returns.
pub struct ActorContext<'a> {
    base: &'a mut ActorBase,
    core: &'a mut SupervisorCore,
}

impl<'a> ActorContext<'a> {
    pub(crate) fn new(base: &'a mut ActorBase, core: &'a mut SupervisorCore) -> Self {
        ActorContext { base, core }
    }

    /// The actor's primary address.
    pub fn address(&self) -> &Address {
        self.base.address()
    }

    /// Address of the owning supervisor.
    pub fn supervisor_address(&self) -> &Address {
        self.base.supervisor_address()
    }

    /// Current lifecycle state of the actor.
    pub fn state(&self) -> ActorState {
        self.base.state()
    }

    /// Mints an additional address on the owning supervisor.
    pub fn create_address(&mut self) -> Address {
        self.core.create_address()
    }

    /// Sends a plain message to `destination`.
    pub fn send<P: Payload>(&mut self, destination: &Address, payload: P) -> Result<(), ErrorKind> {
        self.base.send(destination, payload)
    }

    /// Starts a correlated request; finish with
    /// [`send`](RequestBuilder::send) and a timeout.
    ///
    /// The response arrives at the handler installed with
    /// [`subscribe_response`](Self::subscribe_response) for the same request
    /// kind — either the typed reply or a synthesized error response,
    /// exactly one of the two.
    pub fn request<R: Request>(&mut self, destination: &Address, payload: R) -> RequestBuilder<'_, R> {
        RequestBuilder {
            base: &mut *self.base,
            core: &mut *self.core,
            destination: destination.clone(),
            payload,
        }
    }

    /// Answers a request with a successful response.
    pub fn reply_to<R: Request>(&self, request: &RequestEnvelope<R>, response: R::Response) {
        request.reply(response);
    }

    /// Answers a request with an error code and no payload.
    pub fn reply_with_error<R: Request>(&self, request: &RequestEnvelope<R>, error: ErrorKind) {
        request.reply_with_error(error);
    }

    /// Subscribes a typed handler owned by this actor on `address`.
    ///
    /// The address may belong to a foreign supervisor; delivery is then
    /// forwarded back to this actor's supervisor as a handler call. The
    /// returned handler is the token for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<A, P, F>(&mut self, address: &Address, handler: F) -> Arc<Handler>
    where
        A: Actor,
        P: Payload,
        F: Fn(&mut A, &P, &mut ActorContext<'_>) + Send + Sync + 'static,
    {
        let handler = Handler::on::<A, P, F>(self.base.address().clone(), handler);
        self.base.subscribe_point(self.core, handler, address)
    }

    /// Subscribes a correlating response handler for a request kind on this
    /// actor's own address. Responses that no longer correlate to an
    /// in-flight request are dropped before the handler runs.
    pub fn subscribe_response<A, R, F>(&mut self, handler: F) -> Arc<Handler>
    where
        A: Actor,
        R: Request,
        F: Fn(&mut A, &ResponseEnvelope<R>, &mut ActorContext<'_>) + Send + Sync + 'static,
    {
        let own = self.base.address().clone();
        let handler = Handler::on_response::<A, R, F>(own.clone(), handler);
        self.base.subscribe_point(self.core, handler, &own)
    }

    /// Retires one occurrence of `(handler, address)`. `on_done` runs once
    /// the point is fully committed; after that, no further message on
    /// `address` reaches the handler.
    pub fn unsubscribe(
        &mut self,
        handler: &Arc<Handler>,
        address: &Address,
        on_done: Option<UnsubscribeDone>,
    ) {
        let point = SubscriptionPoint::new(Arc::clone(handler), address.clone());
        self.base.unsubscribe_point(self.core, point, on_done);
    }

    /// Begins this actor's shutdown through its supervisor. Safe to call
    /// repeatedly; only the first call does anything.
    pub fn do_shutdown(&mut self) {
        self.base.do_shutdown();
    }

    /// Requests a link to a server actor. The outcome arrives at the
    /// response handler the framework installs for [`LinkRequest`];
    /// on success the server is tracked in this actor's linked servers and
    /// unlinked automatically during shutdown.
    pub fn link(&mut self, server: &Address, timeout: Duration) -> Result<RequestId, ErrorKind> {
        let payload = LinkRequest {
            client: self.base.address().clone(),
            server: server.clone(),
        };
        self.base.send_request(self.core, server, payload, timeout)
    }

    /// Asks a linked server to drop the link; the server answers with an
    /// unlink notification.
    pub fn unlink(&mut self, server: &Address, timeout: Duration) -> Result<RequestId, ErrorKind> {
        let payload = UnlinkRequest {
            server: server.clone(),
        };
        self.base.send_request(self.core, server, payload, timeout)
    }

    /// Servers currently linked by this actor (client role).
    pub fn linked_servers(&self) -> &[Address] {
        &self.base.links.servers
    }

    /// Clients currently linked to this actor (server role).
    pub fn linked_clients(&self) -> &[Address] {
        &self.base.links.clients
    }
}

/// Pending request, finished by [`send`](RequestBuilder::send).
pub struct RequestBuilder<'a, R: Request> {
    base: &'a mut ActorBase,
    core: &'a mut SupervisorCore,
    destination: Address,
    payload: R,
}

impl<R: Request> RequestBuilder<'_, R> {
    /// Sends the request with the given response deadline and returns its
    /// correlation id.
    pub fn send(self, timeout: Duration) -> Result<RequestId, ErrorKind> {
        self.base
            .send_request(self.core, &self.destination, self.payload, timeout)
    }
}
