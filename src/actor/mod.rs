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

//! Actors: the user trait, the lifecycle state machine, and the cell that
//! carries an actor through it.
//!
//! User code implements [`Actor`] on a plain state struct. The framework
//! wraps it in an [`ActorCell`] together with an [`ActorBase`] (addresses,
//! lifecycle state, in-flight requests, subscription bookkeeping) and the
//! actor's plugins, and hands the cell to a supervisor. Every lifecycle
//! transition is driven by messages arriving through the supervisor's queue;
//! nothing here ever runs off the owning supervisor's loop.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, trace, warn};

use crate::address::Address;
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{
    Envelope, InitConfirmation, InitRequest, Payload, Request, RequestEnvelope, RequestId,
    ResponseEnvelope, ShutdownConfirmation, ShutdownRequest, ShutdownTrigger,
    SubscriptionConfirmation, UnsubscribeDone, UnsubscriptionConfirmation,
};
use crate::plugin::{LifecyclePlugin, LinkPlugin, Plugin, PollOutcome, Slot, SubscriptionsPlugin};
use crate::subscription::SubscriptionPoint;
use crate::supervisor::SupervisorCore;

mod config;
mod context;

pub use config::ActorConfig;
pub use context::{ActorContext, RequestBuilder};

/// Lifecycle states of an actor.
///
/// Progression is monotone; the only branch is `Initializing →
/// ShuttingDown` when initialization fails or times out. There is no path
/// back to `New` or `Initializing` after leaving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActorState {
    /// Constructed, not yet handed to its supervisor.
    New,
    /// Plugins activating, init slot being consumed.
    Initializing,
    /// Init finished and confirmed; waiting for the start trigger.
    Initialized,
    /// Fully running.
    Operational,
    /// Shutdown slot being consumed, subscriptions draining.
    ShuttingDown,
    /// Torn down; the terminal state.
    ShutDown,
}

impl ActorState {
    /// The states this state may legally transition to.
    pub fn successors(self) -> &'static [ActorState] {
        match self {
            ActorState::New => &[ActorState::Initializing],
            ActorState::Initializing => &[ActorState::Initialized, ActorState::ShuttingDown],
            ActorState::Initialized => &[ActorState::Operational, ActorState::ShuttingDown],
            ActorState::Operational => &[ActorState::ShuttingDown],
            ActorState::ShuttingDown => &[ActorState::ShutDown],
            ActorState::ShutDown => &[],
        }
    }
}

/// The user-facing actor contract.
///
/// All three hooks run on the owning supervisor's loop and are optional.
/// `configure` is where an actor installs its subscriptions; it runs during
/// plugin activation, so every point made here gates `init_finish` until
/// confirmed.
pub trait Actor: Send + 'static {
    /// Install subscriptions and do pre-init setup.
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        let _ = ctx;
    }

    /// The actor has become `Operational`.
    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let _ = ctx;
    }

    /// The actor has entered `ShuttingDown`.
    fn on_shutdown(&mut self, ctx: &mut ActorContext<'_>) {
        let _ = ctx;
    }
}

/// Object-safe bridge giving the dispatch path `Any` access to the concrete
/// actor type.
pub(crate) trait AnyActor: Actor {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Actor> AnyActor for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An entry in the per-actor in-flight request map. The timeout response is
/// pre-built and armed when the request is sent, so the entry only has to
/// remember the timer to cancel.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    /// Timer to cancel when the real response wins; `None` when the request
    /// failed at dispatch and the error response is already queued.
    pub(crate) timer: Option<crate::supervisor::TimerId>,
}

/// Link-protocol state carried on the actor base.
#[derive(Default)]
pub(crate) struct LinkState {
    /// Clients linked to this actor (server role).
    pub(crate) clients: Vec<Address>,
    /// Servers this actor is linked to (client role).
    pub(crate) servers: Vec<Address>,
    /// Unlink requests to servers have been issued during shutdown.
    pub(crate) draining: bool,
    /// Deadline armed for unilateral unlink of remaining clients.
    pub(crate) deadline_timer: Option<crate::supervisor::TimerId>,
}

/// Framework state of one actor: identity, lifecycle, correlation, and
/// subscription bookkeeping. Plugins and the context API operate on this;
/// user state lives next to it in the [`ActorCell`].
pub struct ActorBase {
    address: Address,
    supervisor: Address,
    state: ActorState,
    pub(crate) init_request: Option<RequestEnvelope<InitRequest>>,
    pub(crate) shutdown_request: Option<RequestEnvelope<ShutdownRequest>>,
    next_request_id: RequestId,
    in_flight: HashMap<RequestId, PendingRequest>,
    /// Points subscribed but not yet confirmed; gates `init_finish`.
    pub(crate) pending_subscriptions: usize,
    /// Every live point owned by this actor, in subscription order.
    pub(crate) subscription_points: Vec<SubscriptionPoint>,
    /// One unsubscription at a time is in flight while draining.
    pub(crate) unsubscribe_in_flight: bool,
    pub(crate) links: LinkState,
    pub(crate) init_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) unlink_timeout: Option<Duration>,
    activating_plugins: HashSet<&'static str>,
    deactivating_plugins: HashSet<&'static str>,
}

impl ActorBase {
    fn new(address: Address, supervisor: Address, config: &ActorConfig) -> Self {
        ActorBase {
            address,
            supervisor,
            state: ActorState::New,
            init_request: None,
            shutdown_request: None,
            next_request_id: 1,
            in_flight: HashMap::new(),
            pending_subscriptions: 0,
            subscription_points: Vec::new(),
            unsubscribe_in_flight: false,
            links: LinkState::default(),
            init_timeout: config.init_timeout,
            shutdown_timeout: config.shutdown_timeout,
            unlink_timeout: config.unlink_timeout,
            activating_plugins: HashSet::new(),
            deactivating_plugins: HashSet::new(),
        }
    }

    /// The actor's primary address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Address of the owning supervisor.
    pub fn supervisor_address(&self) -> &Address {
        &self.supervisor
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActorState {
        self.state
    }

    pub(crate) fn transition(&mut self, to: ActorState) {
        debug_assert!(
            self.state.successors().contains(&to),
            "illegal actor transition {:?} -> {:?}",
            self.state,
            to
        );
        trace!(actor = ?self.address, from = ?self.state, to = ?to, "lifecycle transition");
        self.state = to;
    }

    /// Sends a plain message.
    pub fn send<P: Payload>(&self, destination: &Address, payload: P) -> Result<(), ErrorKind> {
        if self.state == ActorState::ShutDown {
            return Err(ErrorKind::StillShuttingDown);
        }
        destination
            .deliver(Envelope::new(destination.clone(), payload))
            .map_err(|dropped| {
                warn!(
                    destination = ?destination,
                    message = dropped.type_name(),
                    "destination supervisor is gone, dropping message"
                );
                ErrorKind::DispatchFailed
            })
    }

    /// Sends a correlated request and arms its timeout.
    ///
    /// Exactly one of {typed response, `request_timeout` response} will reach
    /// this actor later. When the destination supervisor is already gone, a
    /// `dispatch_failed` response is queued immediately instead and no timer
    /// is armed.
    pub(crate) fn send_request<R: Request>(
        &mut self,
        core: &mut SupervisorCore,
        destination: &Address,
        payload: R,
        timeout: Duration,
    ) -> Result<RequestId, ErrorKind> {
        if self.state == ActorState::ShutDown {
            return Err(ErrorKind::StillShuttingDown);
        }
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = RequestEnvelope {
            reply_to: self.address.clone(),
            request_id,
            payload,
        };
        let timeout_response = ResponseEnvelope::failure(request.clone(), ErrorKind::RequestTimeout);
        let envelope = Envelope::new(destination.clone(), request.clone());

        match destination.deliver(envelope) {
            Ok(()) => {
                let timer = core.arm_timer(
                    Instant::now() + timeout,
                    Envelope::new(self.address.clone(), timeout_response),
                );
                self.in_flight
                    .insert(request_id, PendingRequest { timer: Some(timer) });
            }
            Err(_) => {
                trace!(
                    destination = ?destination,
                    request_id,
                    "destination supervisor is gone, synthesizing dispatch_failed"
                );
                let failure = ResponseEnvelope::failure(request, ErrorKind::DispatchFailed);
                self.address
                    .deliver_or_log(Envelope::new(self.address.clone(), failure));
                self.in_flight
                    .insert(request_id, PendingRequest { timer: None });
            }
        }
        Ok(request_id)
    }

    pub(crate) fn take_in_flight(&mut self, request_id: RequestId) -> Option<PendingRequest> {
        self.in_flight.remove(&request_id)
    }

    pub(crate) fn cancel_in_flight(&mut self, core: &mut SupervisorCore) {
        for (_, pending) in self.in_flight.drain() {
            if let Some(timer) = pending.timer {
                core.cancel_timer(timer);
            }
        }
    }

    /// Subscribes a handler owned by this actor on `address` and records the
    /// point for confirmation gating and shutdown teardown.
    pub(crate) fn subscribe_point(
        &mut self,
        core: &mut SupervisorCore,
        handler: std::sync::Arc<Handler>,
        address: &Address,
    ) -> std::sync::Arc<Handler> {
        let point = SubscriptionPoint::new(std::sync::Arc::clone(&handler), address.clone());
        self.pending_subscriptions += 1;
        self.subscription_points.push(point.clone());
        core.subscribe(point);
        handler
    }

    pub(crate) fn unsubscribe_point(
        &mut self,
        core: &mut SupervisorCore,
        point: SubscriptionPoint,
        on_done: Option<UnsubscribeDone>,
    ) {
        core.unsubscribe(point, on_done);
    }

    /// The only public shutdown trigger: asks the owning supervisor to start
    /// this actor's shutdown, so the request arrives through the normal
    /// queue and never inline.
    pub fn do_shutdown(&mut self) {
        if self.state >= ActorState::ShuttingDown {
            trace!(actor = ?self.address, "do_shutdown ignored, already shutting down");
            return;
        }
        let trigger = ShutdownTrigger {
            actor_address: self.address.clone(),
        };
        self.supervisor
            .deliver_or_log(Envelope::new(self.supervisor.clone(), trigger));
    }
}

/// Where plugins are installed, per slot. Entries are indices into the
/// cell's plugin list; init consumes from the front, shutdown from the back.
#[derive(Default)]
struct SlotTable {
    init: VecDeque<usize>,
    shutdown: Vec<usize>,
    subscription: Vec<usize>,
    unsubscription: Vec<usize>,
}

impl SlotTable {
    fn install(&mut self, slot: Slot, plugin: usize) {
        match slot {
            Slot::Init => self.init.push_back(plugin),
            Slot::Shutdown => self.shutdown.push(plugin),
            Slot::Subscription => self.subscription.push(plugin),
            Slot::Unsubscription => self.unsubscription.push(plugin),
        }
    }

    fn uninstall(&mut self, plugin: usize) {
        self.init.retain(|&p| p != plugin);
        self.shutdown.retain(|&p| p != plugin);
        self.subscription.retain(|&p| p != plugin);
        self.unsubscription.retain(|&p| p != plugin);
    }
}

/// One actor as its supervisor holds it: framework state, plugins, and the
/// user state, mutated only from the owning supervisor's loop.
pub struct ActorCell {
    base: ActorBase,
    plugins: Vec<Box<dyn Plugin>>,
    /// Which plugins completed activation; only these deactivate.
    active: Vec<bool>,
    slots: SlotTable,
    state: Box<dyn AnyActor>,
}

impl ActorCell {
    pub(crate) fn new<A: Actor>(
        actor: A,
        address: Address,
        supervisor: Address,
        mut config: ActorConfig,
    ) -> Self {
        // Subscriptions first: its confirmation handlers must be the first
        // points subscribed, so the reverse-order drain retires them last
        // and every other point's confirmation still finds a handler.
        let mut plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(SubscriptionsPlugin),
            Box::new(LifecyclePlugin),
            Box::new(LinkPlugin),
        ];
        plugins.append(&mut config.plugins);
        let active = vec![false; plugins.len()];
        ActorCell {
            base: ActorBase::new(address, supervisor, &config),
            plugins,
            active,
            slots: SlotTable::default(),
            state: Box::new(actor),
        }
    }

    pub(crate) fn base(&self) -> &ActorBase {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    pub(crate) fn split_for_dispatch(&mut self) -> (&mut ActorBase, &mut dyn AnyActor) {
        (&mut self.base, self.state.as_mut())
    }

    fn run_hook(&mut self, core: &mut SupervisorCore, hook: fn(&mut dyn AnyActor, &mut ActorContext<'_>)) {
        let (base, state) = (&mut self.base, self.state.as_mut());
        let mut ctx = ActorContext::new(base, core);
        hook(state, &mut ctx);
    }

    // ----- initialization -------------------------------------------------

    /// Entry into the lifecycle: `New → Initializing`, activate every plugin
    /// (install order), then run the user's `configure`. An activation
    /// failure cascades deactivation and leaves the caller to tear the cell
    /// down.
    pub(crate) fn initialize(&mut self, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        self.base.transition(ActorState::Initializing);
        self.activate_plugins(core)?;
        self.run_hook(core, |state, ctx| state.configure(ctx));
        Ok(())
    }

    fn activate_plugins(&mut self, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        for index in 0..self.plugins.len() {
            let identity = self.plugins[index].identity();
            self.base.activating_plugins.insert(identity);
            let result = self.plugins[index].activate(&mut self.base, core);
            match result {
                Ok(()) => {
                    // commit_activation(success)
                    self.base.activating_plugins.remove(identity);
                    self.active[index] = true;
                    for slot in self.plugins[index].slots() {
                        self.slots.install(*slot, index);
                    }
                }
                Err(err) => {
                    error!(
                        actor = ?self.base.address,
                        plugin = identity,
                        error = %err,
                        "plugin activation failed"
                    );
                    self.deactivate_plugins(core);
                    return Err(ErrorKind::PluginActivationFailed { plugin: identity });
                }
            }
        }
        Ok(())
    }

    /// Deactivates still-active plugins in reverse install order. The cell
    /// is destructible only once `deactivating_plugins` is empty again.
    pub(crate) fn deactivate_plugins(&mut self, core: &mut SupervisorCore) {
        for index in (0..self.plugins.len()).rev() {
            if !self.active[index] {
                continue;
            }
            let identity = self.plugins[index].identity();
            self.base.deactivating_plugins.insert(identity);
            self.plugins[index].deactivate(&mut self.base, core);
            self.slots.uninstall(index);
            self.active[index] = false;
            // commit_deactivation
            self.base.deactivating_plugins.remove(identity);
        }
        debug_assert!(self.base.deactivating_plugins.is_empty());
    }

    /// Stores the init request and resumes the init pipeline.
    pub(crate) fn begin_init(
        &mut self,
        request: RequestEnvelope<InitRequest>,
        core: &mut SupervisorCore,
    ) {
        if self.base.state != ActorState::Initializing {
            trace!(actor = ?self.base.address, state = ?self.base.state, "late init request ignored");
            return;
        }
        self.base.init_request = Some(request);
        self.init_continue(core);
    }

    /// Walks the init slot front-to-back. Each plugin answering `true` is
    /// released; the first `false` suspends the phase. When the slot is
    /// empty the init request is answered and the actor is `Initialized`.
    pub(crate) fn init_continue(&mut self, core: &mut SupervisorCore) {
        debug_assert_eq!(self.base.state, ActorState::Initializing);
        while let Some(&index) = self.slots.init.front() {
            if self.plugins[index].handle_init(&mut self.base, core) {
                self.slots.init.pop_front();
            } else {
                break;
            }
        }
        if self.slots.init.is_empty() && self.base.init_request.is_some() {
            self.init_finish();
        }
    }

    fn init_finish(&mut self) {
        if let Some(request) = self.base.init_request.take() {
            request.reply(InitConfirmation);
        }
        self.base.transition(ActorState::Initialized);
    }

    /// `Initialized → Operational`, then the user's `on_start` hook.
    pub(crate) fn start(&mut self, core: &mut SupervisorCore) {
        if self.base.state != ActorState::Initialized {
            trace!(actor = ?self.base.address, state = ?self.base.state, "start trigger ignored");
            return;
        }
        self.base.transition(ActorState::Operational);
        self.run_hook(core, |state, ctx| state.on_start(ctx));
    }

    // ----- shutdown -------------------------------------------------------

    /// Stores the shutdown request and enters the shutdown pipeline.
    pub(crate) fn begin_shutdown(
        &mut self,
        request: RequestEnvelope<ShutdownRequest>,
        core: &mut SupervisorCore,
    ) {
        match self.base.state {
            ActorState::ShutDown => request.reply(ShutdownConfirmation),
            ActorState::ShuttingDown => {
                trace!(actor = ?self.base.address, "duplicate shutdown request ignored");
            }
            _ => {
                self.base.shutdown_request = Some(request);
                self.shutdown_start(core);
                self.shutdown_continue(core);
            }
        }
    }

    fn shutdown_start(&mut self, core: &mut SupervisorCore) {
        // A stalled init request is abandoned; the supervisor's init
        // watchdog has already timed it out on its side.
        self.base.init_request = None;
        self.base.transition(ActorState::ShuttingDown);
        self.run_hook(core, |state, ctx| state.on_shutdown(ctx));
    }

    /// Walks the shutdown slot back-to-front, mirror of
    /// [`init_continue`](Self::init_continue).
    pub(crate) fn shutdown_continue(&mut self, core: &mut SupervisorCore) {
        if self.base.state != ActorState::ShuttingDown {
            return;
        }
        while let Some(&index) = self.slots.shutdown.last() {
            if self.plugins[index].handle_shutdown(&mut self.base, core) {
                self.slots.shutdown.pop();
            } else {
                break;
            }
        }
        if self.slots.shutdown.is_empty() {
            self.shutdown_finish(core);
        }
    }

    fn shutdown_finish(&mut self, core: &mut SupervisorCore) {
        self.base.cancel_in_flight(core);
        self.deactivate_plugins(core);
        if let Some(request) = self.base.shutdown_request.take() {
            request.reply(ShutdownConfirmation);
        }
        self.base.transition(ActorState::ShutDown);
        if self.base.address == core.supervisor_address() {
            core.halt();
        }
    }

    /// Forced teardown after a shutdown timeout: subscriptions are discarded
    /// without the confirmation ceremony so nothing leaks, and the actor is
    /// moved to `ShutDown` regardless of pending plugin work.
    pub(crate) fn force_shutdown(&mut self, core: &mut SupervisorCore) {
        if self.base.state == ActorState::ShutDown {
            return;
        }
        warn!(actor = ?self.base.address, state = ?self.base.state, "forcing shutdown");
        self.base.cancel_in_flight(core);
        if let Some(timer) = self.base.links.deadline_timer.take() {
            core.cancel_timer(timer);
        }
        for point in std::mem::take(&mut self.base.subscription_points) {
            core.discard_subscription(&point);
        }
        self.deactivate_plugins(core);
        self.base.shutdown_request = None;
        if self.base.state != ActorState::ShuttingDown {
            self.base.transition(ActorState::ShuttingDown);
        }
        self.base.transition(ActorState::ShutDown);
    }

    // ----- subscription confirmations ------------------------------------

    /// Polls the subscription slot in reverse order, then resumes a
    /// suspended init phase if the confirmation unblocked it.
    pub(crate) fn on_subscription(
        &mut self,
        confirmation: &SubscriptionConfirmation,
        core: &mut SupervisorCore,
    ) {
        self.poll_slot(core, |plugin, base, core| {
            plugin.handle_subscription(confirmation, base, core)
        }, true);
        if self.base.state == ActorState::Initializing && self.base.init_request.is_some() {
            self.init_continue(core);
        }
    }

    /// Polls the unsubscription slot in reverse order, commits the point,
    /// then resumes a suspended shutdown phase.
    pub(crate) fn on_unsubscription(
        &mut self,
        confirmation: &UnsubscriptionConfirmation,
        core: &mut SupervisorCore,
    ) {
        self.poll_slot(core, |plugin, base, core| {
            plugin.handle_unsubscription(confirmation, base, core)
        }, false);
        core.commit_unsubscription(confirmation);
        if self.base.state == ActorState::ShuttingDown {
            self.shutdown_continue(core);
        }
    }

    fn poll_slot<F>(&mut self, core: &mut SupervisorCore, mut poll: F, subscription: bool)
    where
        F: FnMut(&mut dyn Plugin, &mut ActorBase, &mut SupervisorCore) -> PollOutcome,
    {
        let slot = if subscription {
            &mut self.slots.subscription
        } else {
            &mut self.slots.unsubscription
        };
        let mut position = slot.len();
        while position > 0 {
            position -= 1;
            let index = slot[position];
            match poll(self.plugins[index].as_mut(), &mut self.base, core) {
                PollOutcome::Ignored => continue,
                PollOutcome::Consumed => break,
                PollOutcome::Finished => {
                    slot.remove(position);
                }
            }
        }
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("address", &self.base.address)
            .field("state", &self.base.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successors_enforce_the_monotone_fsm() {
        use ActorState::*;
        assert_eq!(New.successors(), &[Initializing]);
        assert!(Initializing.successors().contains(&ShuttingDown));
        assert!(Initializing.successors().contains(&Initialized));
        assert!(!Operational.successors().contains(&Initializing));
        assert!(ShutDown.successors().is_empty());
        // No state may reach back to New or Initializing.
        for state in [Initializing, Initialized, Operational, ShuttingDown, ShutDown] {
            assert!(!state.successors().contains(&New));
            assert!(!state.successors().contains(&Initializing) || state == New);
        }
    }

    #[test]
    fn states_order_by_progression() {
        assert!(ActorState::New < ActorState::Initializing);
        assert!(ActorState::Operational < ActorState::ShuttingDown);
        assert!(ActorState::ShuttingDown < ActorState::ShutDown);
    }
}
