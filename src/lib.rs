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

#![forbid(unsafe_code)]
//! Apiary — an in-process actor framework.
//!
//! Applications structure concurrent logic as actors exchanging typed
//! messages through addresses managed by supervisors. Each supervisor owns a
//! delivery queue bound to one tokio task; every piece of state it
//! supervises is mutated only from that task, and supervisors on different
//! tasks communicate exclusively by sending messages to each other's
//! addresses. Handlers never suspend: control returns to the event loop
//! between any two deliveries, and request/response is expressed by
//! returning and awaiting a later message.
//!
//! The lifecycle of every actor — initialization, start, shutdown,
//! subscription teardown — is driven by an ordered plugin pipeline and
//! travels through the same queues as user traffic, so ordering guarantees
//! apply to the framework's own protocol too.

pub(crate) mod actor;
pub(crate) mod address;
pub(crate) mod error;
pub(crate) mod handler;
pub(crate) mod message;
pub(crate) mod plugin;
pub(crate) mod registry;
pub(crate) mod subscription;
pub(crate) mod supervisor;
pub(crate) mod system;

pub use error::ErrorKind;

/// Convenient imports for applications building on the framework.
pub mod prelude {
    pub use crate::actor::{Actor, ActorBase, ActorConfig, ActorContext, ActorState, RequestBuilder};
    pub use crate::address::Address;
    pub use crate::error::ErrorKind;
    pub use crate::handler::Handler;
    pub use crate::message::{
        DeregisterNotify, DeregisterService, DiscoveryReply, DiscoveryRequest, Envelope,
        LinkRequest, LinkResponse, Payload, RegistrationRequest, RegistrationResponse, Request,
        RequestEnvelope, RequestId, ResponseEnvelope, StateQuery, StateReport,
        SubscriptionConfirmation, UnlinkNotify, UnlinkRequest, UnsubscribeDone,
        UnsubscriptionConfirmation,
    };
    pub use crate::plugin::{Plugin, PollOutcome, Slot};
    pub use crate::registry::Registry;
    pub use crate::subscription::SubscriptionPoint;
    pub use crate::supervisor::{
        Supervisor, SupervisorConfig, SupervisorCore, SupervisorHandle, TimerBackend, TimerId,
        TokioTimer,
    };
    pub use crate::system::ActorSystem;
}
