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

//! Probe actors shared across the integration tests. They observe the
//! framework from the outside by forwarding everything interesting to an
//! unbounded channel the test polls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use apiary::prelude::*;

use super::messages::{Detach, DropLink, Flush, Note, Ping, Pong};

/// Reports its lifecycle hooks and every [`Note`] delivered to the watched
/// address (its own, unless told otherwise).
pub struct Recorder {
    events: mpsc::UnboundedSender<String>,
    watch: Option<Address>,
    unsubscribe_done: Option<oneshot::Sender<()>>,
    note_handler: Option<Arc<Handler>>,
    watched: Option<Address>,
}

impl Recorder {
    pub fn new(events: mpsc::UnboundedSender<String>) -> Self {
        Recorder {
            events,
            watch: None,
            unsubscribe_done: None,
            note_handler: None,
            watched: None,
        }
    }

    /// Watches `address` instead of the recorder's own.
    pub fn watching(events: mpsc::UnboundedSender<String>, address: Address) -> Self {
        Recorder {
            watch: Some(address),
            ..Recorder::new(events)
        }
    }

    /// Fires the given channel once a [`Detach`]-triggered unsubscription
    /// has fully committed.
    pub fn detach_signal(mut self, done: oneshot::Sender<()>) -> Self {
        self.unsubscribe_done = Some(done);
        self
    }
}

impl Actor for Recorder {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let target = self
            .watch
            .clone()
            .unwrap_or_else(|| ctx.address().clone());
        let handler = ctx.subscribe::<Recorder, Note, _>(&target, |me, note, _ctx| {
            let _ = me.events.send(format!("note:{}", note.text));
        });
        self.note_handler = Some(handler);
        self.watched = Some(target);

        let own = ctx.address().clone();
        ctx.subscribe::<Recorder, Detach, _>(&own, |me, _detach, ctx| {
            if let (Some(handler), Some(address)) = (me.note_handler.take(), me.watched.clone()) {
                let on_done: Option<UnsubscribeDone> = me.unsubscribe_done.take().map(|done| {
                    Box::new(move || {
                        let _ = done.send(());
                    }) as UnsubscribeDone
                });
                ctx.unsubscribe(&handler, &address, on_done);
            }
        });
        let _ = self.events.send("configured".to_string());
    }

    fn on_start(&mut self, _ctx: &mut ActorContext<'_>) {
        let _ = self.events.send("started".to_string());
    }

    fn on_shutdown(&mut self, _ctx: &mut ActorContext<'_>) {
        let _ = self.events.send("shutting_down".to_string());
    }
}

/// Answers every [`Ping`] immediately with a matching [`Pong`].
#[derive(Default)]
pub struct Echo;

impl Actor for Echo {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let own = ctx.address().clone();
        ctx.subscribe::<Echo, RequestEnvelope<Ping>, _>(&own, |_me, request, ctx| {
            ctx.reply_to(
                request,
                Pong {
                    value: request.payload.value,
                },
            );
        });
    }
}

/// Swallows every [`Ping`] until flushed, then answers them all — late, so
/// the requester's timeout has long since won.
#[derive(Default)]
pub struct Mute {
    pending: Vec<RequestEnvelope<Ping>>,
}

impl Actor for Mute {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let own = ctx.address().clone();
        ctx.subscribe::<Mute, RequestEnvelope<Ping>, _>(&own, |me, request, _ctx| {
            me.pending.push(request.clone());
        });
        ctx.subscribe::<Mute, Flush, _>(&own, |me, _flush, ctx| {
            for request in me.pending.drain(..) {
                let value = request.payload.value;
                ctx.reply_to(&request, Pong { value });
            }
        });
    }
}

/// Sends one [`Ping`] at start and reports whichever arm of the correlator
/// answers: the typed response or a synthesized error.
pub struct Requester {
    events: mpsc::UnboundedSender<String>,
    target: Address,
    timeout: Duration,
}

impl Requester {
    pub fn new(events: mpsc::UnboundedSender<String>, target: Address, timeout: Duration) -> Self {
        Requester {
            events,
            target,
            timeout,
        }
    }
}

impl Actor for Requester {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        ctx.subscribe_response::<Requester, Ping, _>(|me, response, _ctx| {
            let event = match (&response.error, &response.payload) {
                (None, Some(pong)) => format!("pong:{}", pong.value),
                (Some(error), _) => format!("error:{}", error.as_label()),
                (None, None) => "empty".to_string(),
            };
            let _ = me.events.send(event);
        });
    }

    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let target = self.target.clone();
        let timeout = self.timeout;
        let _ = ctx.request(&target, Ping { value: 7 }).send(timeout);
    }
}

/// Asks a supervisor for the state of one actor and reports the reply.
pub struct StateProbe {
    events: mpsc::UnboundedSender<String>,
    supervisor: Address,
    subject: Address,
}

impl StateProbe {
    pub fn new(
        events: mpsc::UnboundedSender<String>,
        supervisor: Address,
        subject: Address,
    ) -> Self {
        StateProbe {
            events,
            supervisor,
            subject,
        }
    }
}

impl Actor for StateProbe {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        ctx.subscribe_response::<StateProbe, StateQuery, _>(|me, response, _ctx| {
            let event = match (&response.error, &response.payload) {
                (None, Some(report)) => format!("state:{:?}", report.state),
                (Some(error), _) => format!("error:{}", error.as_label()),
                (None, None) => "empty".to_string(),
            };
            let _ = me.events.send(event);
        });
    }

    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let supervisor = self.supervisor.clone();
        let subject = self.subject.clone();
        let _ = ctx
            .request(&supervisor, StateQuery { subject })
            .send(Duration::from_secs(1));
    }
}

/// Links to a server at start, unlinks on [`DropLink`], and reports any
/// unilateral unlink notification the server sends while shutting down.
pub struct LinkClient {
    events: mpsc::UnboundedSender<String>,
    server: Address,
}

impl LinkClient {
    pub fn new(events: mpsc::UnboundedSender<String>, server: Address) -> Self {
        LinkClient { events, server }
    }
}

impl Actor for LinkClient {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let own = ctx.address().clone();
        ctx.subscribe::<LinkClient, UnlinkNotify, _>(&own, |me, notify, _ctx| {
            let _ = me
                .events
                .send(format!("unlink_notify:{}", notify.server.id()));
        });
        ctx.subscribe::<LinkClient, DropLink, _>(&own, |me, _drop, ctx| {
            let server = me.server.clone();
            let _ = ctx.unlink(&server, Duration::from_secs(1));
        });
    }

    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let server = self.server.clone();
        let _ = ctx.link(&server, Duration::from_secs(1));
        let _ = self.events.send("link_requested".to_string());
    }
}

/// A plugin that never finishes its init step; actors carrying it stall in
/// `Initializing` until the supervisor's init watchdog fires.
pub struct StallPlugin;

impl Plugin for StallPlugin {
    fn identity(&self) -> &'static str {
        "stall"
    }

    fn slots(&self) -> &'static [Slot] {
        &[Slot::Init]
    }

    fn handle_init(&mut self, _actor: &mut ActorBase, _core: &mut SupervisorCore) -> bool {
        false
    }
}
