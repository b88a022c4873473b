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

use tokio::time::Instant;
use tracing::{trace, warn};

use crate::actor::{ActorBase, ActorState};
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{
    Envelope, LinkRequest, LinkResponse, RequestEnvelope, UnlinkDeadline, UnlinkNotify,
    UnlinkRequest,
};
use crate::plugin::{Plugin, Slot};
use crate::supervisor::SupervisorCore;

/// Directional links between client and server actors.
///
/// A server accepts links only when it has an unlink timeout configured.
/// Link state must be cleared before either side can finish shutting down: a
/// client asks its servers to unlink and waits for the notifications; a
/// server waits for its clients to unlink until its unlink deadline elapses,
/// then notifies the stragglers unilaterally.
pub(crate) struct LinkPlugin;

impl Plugin for LinkPlugin {
    fn identity(&self) -> &'static str {
        "link"
    }

    fn slots(&self) -> &'static [Slot] {
        &[Slot::Shutdown]
    }

    fn activate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        let address = actor.address().clone();

        // Server side: accept or refuse incoming links.
        let on_link = Handler::system::<RequestEnvelope<LinkRequest>, _>(
            address.clone(),
            |cell, request, _core| {
                let base = cell.base_mut();
                if base.state() >= ActorState::ShuttingDown {
                    request.reply_with_error(ErrorKind::StillShuttingDown);
                } else if base.unlink_timeout.is_some() {
                    base.links.clients.push(request.payload.client.clone());
                    request.reply(LinkResponse);
                } else {
                    request.reply_with_error(ErrorKind::ActorNotLinkable);
                }
            },
        );
        actor.subscribe_point(core, on_link, &address);

        // Server side: a client asks out of the link.
        let on_unlink = Handler::system::<RequestEnvelope<UnlinkRequest>, _>(
            address.clone(),
            |cell, request, core| {
                let base = cell.base_mut();
                let client = request.reply_to.clone();
                if let Some(position) = base.links.clients.iter().position(|c| *c == client) {
                    base.links.clients.remove(position);
                }
                request.reply(UnlinkNotify {
                    server: base.address().clone(),
                    client,
                });
                if base.links.clients.is_empty() {
                    if let Some(timer) = base.links.deadline_timer.take() {
                        core.cancel_timer(timer);
                    }
                }
                if base.state() == ActorState::ShuttingDown {
                    cell.shutdown_continue(core);
                }
            },
        );
        actor.subscribe_point(core, on_unlink, &address);

        // Client side: the server's answer to our link request.
        let on_linked = Handler::system_response::<LinkRequest, _>(
            address.clone(),
            |cell, response, _core| {
                let base = cell.base_mut();
                match &response.error {
                    None => base.links.servers.push(response.request.payload.server.clone()),
                    Some(error) => trace!(
                        server = ?response.request.payload.server,
                        error = error.as_label(),
                        "link refused"
                    ),
                }
            },
        );
        actor.subscribe_point(core, on_linked, &address);

        // Client side: the server's answer to our unlink request. The link
        // is dropped even on timeout or dispatch failure; a dead server
        // holds no link worth waiting for.
        let on_unlinked = Handler::system_response::<UnlinkRequest, _>(
            address.clone(),
            |cell, response, core| {
                let base = cell.base_mut();
                let server = &response.request.payload.server;
                base.links.servers.retain(|s| s != server);
                if base.state() == ActorState::ShuttingDown {
                    cell.shutdown_continue(core);
                }
            },
        );
        actor.subscribe_point(core, on_unlinked, &address);

        // Client side: unilateral unlink from a shutting-down server.
        let on_notify = Handler::system::<UnlinkNotify, _>(address.clone(), |cell, notify, core| {
            let base = cell.base_mut();
            base.links.servers.retain(|s| *s != notify.server);
            if base.state() == ActorState::ShuttingDown {
                cell.shutdown_continue(core);
            }
        });
        actor.subscribe_point(core, on_notify, &address);

        // Server side: the unlink deadline elapsed with clients remaining.
        let on_deadline =
            Handler::system::<UnlinkDeadline, _>(address.clone(), |cell, _deadline, core| {
                let base = cell.base_mut();
                base.links.deadline_timer = None;
                for client in std::mem::take(&mut base.links.clients) {
                    warn!(server = ?base.address(), client = ?client, "unlink deadline elapsed, unlinking unilaterally");
                    let notify = UnlinkNotify {
                        server: base.address().clone(),
                        client: client.clone(),
                    };
                    client.deliver_or_log(Envelope::new(client.clone(), notify));
                }
                if base.state() == ActorState::ShuttingDown {
                    cell.shutdown_continue(core);
                }
            });
        actor.subscribe_point(core, on_deadline, &address);

        Ok(())
    }

    fn handle_shutdown(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> bool {
        if !actor.links.draining {
            actor.links.draining = true;
            let deadline = actor.unlink_timeout.unwrap_or(actor.shutdown_timeout);
            for server in actor.links.servers.clone() {
                let request = UnlinkRequest {
                    server: server.clone(),
                };
                let _ = actor.send_request(core, &server, request, deadline);
            }
            if !actor.links.clients.is_empty() {
                if let Some(timeout) = actor.unlink_timeout {
                    let event = Envelope::new(
                        actor.address().clone(),
                        UnlinkDeadline {
                            server: actor.address().clone(),
                        },
                    );
                    actor.links.deadline_timer =
                        Some(core.arm_timer(Instant::now() + timeout, event));
                }
            }
        }
        actor.links.clients.is_empty() && actor.links.servers.is_empty()
    }
}
