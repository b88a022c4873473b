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

//! Typed handlers and the dispatch boundary.
//!
//! A handler is a callable bound to its owning actor and discriminated by the
//! payload kind it accepts. Dispatch only ever invokes a handler whose tag
//! matches the envelope; a mismatch past that point is a programming error
//! and is asserted. Handlers are shared-ownership: the registry holds them
//! while registered, and the owning actor's supervisor invokes them with the
//! actor's cell borrowed mutably.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::actor::{Actor, ActorCell, ActorContext, AnyActor};
use crate::address::Address;
use crate::message::{Envelope, Payload, Request, ResponseEnvelope};
use crate::supervisor::SupervisorCore;

type InvokeFn = dyn Fn(&mut ActorCell, &Envelope, &mut SupervisorCore) + Send + Sync;

/// Type-erased handler: `{ owning actor, payload tag, invoke }`.
pub struct Handler {
    owner: Address,
    message_type: TypeId,
    type_name: &'static str,
    invoke: Box<InvokeFn>,
}

impl Handler {
    /// Builds a handler invoking a typed function on the owning actor's user
    /// state. The actor-type and payload-kind downcasts are asserted: dispatch
    /// has already matched the tag, and a handler is only ever invoked on the
    /// cell of the actor it was created for.
    pub fn on<A, P, F>(owner: Address, handler: F) -> Arc<Handler>
    where
        A: Actor,
        P: Payload,
        F: Fn(&mut A, &P, &mut ActorContext<'_>) + Send + Sync + 'static,
    {
        Arc::new(Handler {
            owner,
            message_type: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            invoke: Box::new(move |cell, envelope, core| {
                let payload = envelope
                    .payload_as::<P>()
                    .expect("dispatch delivered a mismatched payload kind");
                let (base, state) = cell.split_for_dispatch();
                let actor = state
                    .as_any_mut()
                    .downcast_mut::<A>()
                    .expect("handler invoked on a foreign actor cell");
                let mut ctx = ActorContext::new(base, core);
                handler(actor, payload, &mut ctx);
            }),
        })
    }

    /// Builds a correlating response handler for a request kind.
    ///
    /// The wrapper is the request/response correlator's delivery arm: it
    /// resolves the in-flight entry by id, cancels the armed timer, and only
    /// then invokes the typed function. A response whose entry is gone (late
    /// duplicate, or the loser of a response/timeout race) is dropped
    /// silently.
    pub fn on_response<A, R, F>(owner: Address, handler: F) -> Arc<Handler>
    where
        A: Actor,
        R: Request,
        F: Fn(&mut A, &ResponseEnvelope<R>, &mut ActorContext<'_>) + Send + Sync + 'static,
    {
        Arc::new(Handler {
            owner,
            message_type: TypeId::of::<ResponseEnvelope<R>>(),
            type_name: std::any::type_name::<ResponseEnvelope<R>>(),
            invoke: Box::new(move |cell, envelope, core| {
                let Some(response) = correlate::<R>(cell, envelope, core) else {
                    return;
                };
                let (base, state) = cell.split_for_dispatch();
                let actor = state
                    .as_any_mut()
                    .downcast_mut::<A>()
                    .expect("handler invoked on a foreign actor cell");
                let mut ctx = ActorContext::new(base, core);
                handler(actor, response, &mut ctx);
            }),
        })
    }

    /// Builds a handler operating on the whole cell. Used by the built-in
    /// plugins, whose handlers drive the plugin pipeline itself.
    pub(crate) fn system<P, F>(owner: Address, handler: F) -> Arc<Handler>
    where
        P: Payload,
        F: Fn(&mut ActorCell, &P, &mut SupervisorCore) + Send + Sync + 'static,
    {
        Arc::new(Handler {
            owner,
            message_type: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            invoke: Box::new(move |cell, envelope, core| {
                let payload = envelope
                    .payload_as::<P>()
                    .expect("dispatch delivered a mismatched payload kind");
                handler(cell, payload, core);
            }),
        })
    }

    /// Correlating variant of [`Handler::system`] for responses to requests
    /// the framework itself makes (init and shutdown watchdogs, links).
    pub(crate) fn system_response<R, F>(owner: Address, handler: F) -> Arc<Handler>
    where
        R: Request,
        F: Fn(&mut ActorCell, &ResponseEnvelope<R>, &mut SupervisorCore) + Send + Sync + 'static,
    {
        Arc::new(Handler {
            owner,
            message_type: TypeId::of::<ResponseEnvelope<R>>(),
            type_name: std::any::type_name::<ResponseEnvelope<R>>(),
            invoke: Box::new(move |cell, envelope, core| {
                let Some(response) = correlate::<R>(cell, envelope, core) else {
                    return;
                };
                handler(cell, response, core);
            }),
        })
    }

    /// The actor this handler belongs to.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Payload tag this handler accepts.
    pub fn message_type(&self) -> TypeId {
        self.message_type
    }

    pub(crate) fn invoke(&self, cell: &mut ActorCell, envelope: &Envelope, core: &mut SupervisorCore) {
        (self.invoke)(cell, envelope, core);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("owner", &self.owner)
            .field("message_type", &self.type_name)
            .finish()
    }
}

/// Resolves a response against the owner's in-flight map. `None` means the
/// correlation is gone and the response must be discarded.
fn correlate<'e, R: Request>(
    cell: &mut ActorCell,
    envelope: &'e Envelope,
    core: &mut SupervisorCore,
) -> Option<&'e ResponseEnvelope<R>> {
    let response = envelope
        .payload_as::<ResponseEnvelope<R>>()
        .expect("dispatch delivered a mismatched payload kind");
    match cell.base_mut().take_in_flight(response.request_id) {
        Some(pending) => {
            if let Some(timer) = pending.timer {
                core.cancel_timer(timer);
            }
            Some(response)
        }
        None => {
            trace!(
                request_id = response.request_id,
                response = envelope.type_name(),
                "no in-flight entry, dropping response"
            );
            None
        }
    }
}
