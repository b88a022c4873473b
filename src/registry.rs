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

//! The built-in service registry: an ordinary actor mapping service names to
//! addresses.
//!
//! Host it on any supervisor with
//! [`SupervisorHandle::spawn_actor`](crate::supervisor::SupervisorHandle::spawn_actor)
//! and talk to it with the registry payload kinds. Names are unique;
//! registering a taken name answers `name_already_registered`, and looking
//! up an unknown one answers `service_not_found`.

use std::collections::HashMap;

use tracing::trace;

use crate::actor::{Actor, ActorContext};
use crate::address::Address;
use crate::error::ErrorKind;
use crate::message::{
    DeregisterNotify, DeregisterService, DiscoveryReply, DiscoveryRequest, RegistrationRequest,
    RegistrationResponse, RequestEnvelope,
};

/// Name-to-address mapping service.
#[derive(Default)]
pub struct Registry {
    names: HashMap<String, Address>,
}

impl Actor for Registry {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let address = ctx.address().clone();

        ctx.subscribe::<Registry, RequestEnvelope<RegistrationRequest>, _>(
            &address,
            |registry, request, ctx| {
                let name = &request.payload.name;
                if registry.names.contains_key(name) {
                    ctx.reply_with_error(
                        request,
                        ErrorKind::NameAlreadyRegistered { name: name.clone() },
                    );
                } else {
                    trace!(name = %name, service = ?request.payload.service, "service registered");
                    registry
                        .names
                        .insert(name.clone(), request.payload.service.clone());
                    ctx.reply_to(request, RegistrationResponse);
                }
            },
        );

        ctx.subscribe::<Registry, DeregisterService, _>(&address, |registry, notice, _ctx| {
            registry.names.remove(&notice.name);
        });

        ctx.subscribe::<Registry, DeregisterNotify, _>(&address, |registry, notice, _ctx| {
            registry.names.retain(|_, service| *service != notice.service);
        });

        ctx.subscribe::<Registry, RequestEnvelope<DiscoveryRequest>, _>(
            &address,
            |registry, request, ctx| {
                let name = &request.payload.name;
                match registry.names.get(name) {
                    Some(service) => ctx.reply_to(
                        request,
                        DiscoveryReply {
                            service: service.clone(),
                        },
                    ),
                    None => ctx.reply_with_error(
                        request,
                        ErrorKind::ServiceNotFound { name: name.clone() },
                    ),
                }
            },
        );
    }
}
