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

//! Supervisors: one delivery queue, one event loop, one owner for every
//! piece of actor state it supervises.
//!
//! A supervisor is itself an actor. Its loop drains the queue in FIFO
//! order; three message kinds that need the whole actor set (actor
//! handover, forwarded handler calls, state queries) are intercepted
//! inline, everything else — including the supervisor's own lifecycle —
//! dispatches through the same subscription registry as user traffic.
//! Cross-supervisor delivery is always an explicit message hop onto the
//! foreign queue, never a call into another loop.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace, warn};

use crate::actor::{Actor, ActorCell, ActorConfig, ActorState};
use crate::address::{Address, DeliveryQueue, SupervisorLink};
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{
    CommitUnsubscription, CreateActor, Envelope, ExternalSubscription, ExternalUnsubscription,
    HandlerCall, InitRequest, RequestEnvelope, ShutdownRequest, ShutdownTrigger, StartTrigger,
    StateQuery, StateReport, SubscriptionConfirmation, UnsubscribeDone,
    UnsubscriptionConfirmation,
};
use crate::plugin::{Plugin, Slot};
use crate::subscription::{PointKey, SubscriptionPoint, SubscriptionTable};

mod timer;

pub use timer::{TimerBackend, TimerId, TokioTimer};

static NEXT_SUPERVISOR_ID: AtomicU64 = AtomicU64::new(1);

/// A child actor as the supervisor tracks it.
#[derive(Debug, Clone)]
pub(crate) struct ChildRecord {
    pub(crate) address: Address,
    pub(crate) shutdown_timeout: Duration,
}

/// Deferred mutations of the actor set, recorded by handlers running on a
/// borrowed cell and applied by the loop after dispatch returns.
enum CoreOp {
    RemoveActor(u64),
    ForceShutdown(u64),
}

/// Supervisor state reachable from handlers and plugins while an actor cell
/// is borrowed: the queue, the timers, the subscription table, and child
/// bookkeeping. Everything here is owned by the supervisor's task.
pub struct SupervisorCore {
    supervisor_id: u64,
    address: Address,
    link: std::sync::Arc<SupervisorLink>,
    timers: Box<dyn TimerBackend>,
    subscriptions: SubscriptionTable,
    /// Callbacks parked while an external unsubscription round-trips.
    pending_unsubs: HashMap<PointKey, Option<UnsubscribeDone>>,
    pub(crate) children: Vec<ChildRecord>,
    pub(crate) shutting: HashSet<u64>,
    pub(crate) cascade_started: bool,
    ops: Vec<CoreOp>,
    halted: bool,
}

impl SupervisorCore {
    fn new(
        supervisor_id: u64,
        address: Address,
        link: std::sync::Arc<SupervisorLink>,
        timers: Box<dyn TimerBackend>,
    ) -> Self {
        SupervisorCore {
            supervisor_id,
            address,
            link,
            timers,
            subscriptions: SubscriptionTable::default(),
            pending_unsubs: HashMap::new(),
            children: Vec::new(),
            shutting: HashSet::new(),
            cascade_started: false,
            ops: Vec::new(),
            halted: false,
        }
    }

    /// Id of this supervisor.
    pub fn supervisor_id(&self) -> u64 {
        self.supervisor_id
    }

    /// This supervisor's own address.
    pub fn supervisor_address(&self) -> Address {
        self.address.clone()
    }

    /// Mints a new address owned by this supervisor.
    pub fn create_address(&mut self) -> Address {
        self.link.mint()
    }

    /// Arms a timer that re-enters `event` through this supervisor's queue.
    pub fn arm_timer(&mut self, deadline: Instant, event: Envelope) -> TimerId {
        self.timers.arm(deadline, event)
    }

    /// Cancels an armed timer.
    pub fn cancel_timer(&mut self, timer_id: TimerId) {
        self.timers.cancel(timer_id);
    }

    /// Records a subscription point.
    ///
    /// A point on a local address is recorded immediately and confirmed to
    /// the owning actor through the queue; a point on a foreign address is
    /// forwarded to that address's supervisor, which records it and confirms
    /// back across.
    pub fn subscribe(&mut self, point: SubscriptionPoint) {
        if point.address.supervisor_id() == self.supervisor_id {
            self.subscriptions.insert(&point);
            let owner = point.handler.owner().clone();
            let confirmation = SubscriptionConfirmation { point };
            owner.deliver_or_log(Envelope::new(owner.clone(), confirmation));
        } else {
            let foreign = point.address.supervisor_address();
            let external = ExternalSubscription { point };
            foreign.deliver_or_log(Envelope::new(foreign.clone(), external));
        }
    }

    /// Begins retiring a subscription point.
    ///
    /// On the local path the registry entry survives until the emitted
    /// confirmation is delivered (the commit), so confirmation handlers can
    /// retire themselves last. On the external path the foreign supervisor
    /// drops its entry and answers with a commit message, upon which the
    /// confirmation — carrying `on_done` parked here — is issued locally.
    pub fn unsubscribe(&mut self, point: SubscriptionPoint, on_done: Option<UnsubscribeDone>) {
        if point.address.supervisor_id() == self.supervisor_id {
            let owner = point.handler.owner().clone();
            let confirmation = UnsubscriptionConfirmation::new(point, on_done);
            owner.deliver_or_log(Envelope::new(owner.clone(), confirmation));
        } else {
            self.pending_unsubs.insert(point.key(), on_done);
            let foreign = point.address.supervisor_address();
            let external = ExternalUnsubscription { point };
            foreign.deliver_or_log(Envelope::new(foreign.clone(), external));
        }
    }

    /// Commit half of the unsubscription protocol: runs after the owning
    /// actor has polled the confirmation, removes the registry entry, and
    /// fires the completion callback.
    pub(crate) fn commit_unsubscription(&mut self, confirmation: &UnsubscriptionConfirmation) {
        if confirmation.point.address.supervisor_id() == self.supervisor_id {
            self.subscriptions.remove(&confirmation.point);
        }
        let callback = confirmation
            .on_done
            .lock()
            .expect("unsubscribe callback lock")
            .take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Drops a registry entry without the confirmation ceremony; used on
    /// teardown paths where the owning actor can no longer poll.
    pub(crate) fn discard_subscription(&mut self, point: &SubscriptionPoint) {
        if point.address.supervisor_id() == self.supervisor_id {
            self.subscriptions.remove(point);
        }
    }

    pub(crate) fn take_parked_unsubscribe(&mut self, key: PointKey) -> Option<UnsubscribeDone> {
        self.pending_unsubs.remove(&key).flatten()
    }

    pub(crate) fn matching(&self, address: u64, tag: std::any::TypeId) -> Vec<std::sync::Arc<Handler>> {
        self.subscriptions.matching(address, tag)
    }

    pub(crate) fn remove_actor_later(&mut self, actor: u64) {
        self.ops.push(CoreOp::RemoveActor(actor));
    }

    pub(crate) fn force_shutdown_later(&mut self, actor: u64) {
        self.ops.push(CoreOp::ForceShutdown(actor));
    }

    /// Stops the loop once the current delivery completes. Called by the
    /// supervisor's own cell when it reaches `ShutDown`.
    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    pub(crate) fn halted(&self) -> bool {
        self.halted
    }
}

/// The supervisor's own user-state: empty, all behavior lives in its
/// handlers and the supervising plugin.
struct SupervisorActor;

impl Actor for SupervisorActor {}

/// The plugin that makes an actor a supervisor: child bookkeeping, the
/// shutdown cascade, the external subscription protocol, and the lifecycle
/// watchdog responses.
struct SupervisingPlugin;

impl Plugin for SupervisingPlugin {
    fn identity(&self) -> &'static str {
        "supervising"
    }

    fn slots(&self) -> &'static [Slot] {
        &[Slot::Shutdown]
    }

    fn activate(
        &mut self,
        actor: &mut crate::actor::ActorBase,
        core: &mut SupervisorCore,
    ) -> Result<(), ErrorKind> {
        let address = actor.address().clone();

        // Shutdown entry point for every actor on this supervisor,
        // including the supervisor itself. The shutdown request always goes
        // back out through the queue with the subject's timeout armed.
        let on_trigger = Handler::system::<ShutdownTrigger, _>(
            address.clone(),
            |cell, trigger, core| {
                let target = trigger.actor_address.clone();
                let base = cell.base_mut();
                if target == *base.address() {
                    if base.state() < ActorState::ShuttingDown && core.shutting.insert(target.id()) {
                        let timeout = base.shutdown_timeout;
                        let request = ShutdownRequest {
                            actor_address: target.clone(),
                        };
                        let _ = base.send_request(core, &target, request, timeout);
                    }
                } else if let Some(child) = core
                    .children
                    .iter()
                    .find(|child| child.address == target)
                    .cloned()
                {
                    if core.shutting.insert(target.id()) {
                        let request = ShutdownRequest {
                            actor_address: target.clone(),
                        };
                        let _ = base.send_request(core, &target, request, child.shutdown_timeout);
                    }
                } else {
                    trace!(target = ?target, "shutdown trigger for unknown actor ignored");
                }
            },
        );
        actor.subscribe_point(core, on_trigger, &address);

        // Init watchdog arm of the correlator: success starts the actor,
        // timeout (or dispatch failure) cascades it into shutdown.
        let on_init_response = Handler::system_response::<InitRequest, _>(
            address.clone(),
            |cell, response, _core| {
                let subject = response.request.payload.actor_address.clone();
                let base = cell.base_mut();
                match &response.error {
                    None => {
                        let trigger = StartTrigger {
                            actor_address: subject.clone(),
                        };
                        let _ = base.send(&subject, trigger);
                    }
                    Some(failure) => {
                        error!(
                            actor = ?subject,
                            error = failure.as_label(),
                            "actor failed to initialize, shutting it down"
                        );
                        let own = base.address().clone();
                        let trigger = ShutdownTrigger {
                            actor_address: subject,
                        };
                        let _ = base.send(&own, trigger);
                    }
                }
            },
        );
        actor.subscribe_point(core, on_init_response, &address);

        // Shutdown watchdog arm: a confirmed child is removed, a timed-out
        // child is forced into ShutDown so nothing leaks.
        let on_shutdown_response = Handler::system_response::<ShutdownRequest, _>(
            address.clone(),
            |cell, response, core| {
                let subject = response.request.payload.actor_address.clone();
                core.shutting.remove(&subject.id());
                core.children.retain(|child| child.address != subject);
                let own = cell.base().address().clone();
                if subject == own {
                    if let Some(failure) = &response.error {
                        error!(
                            error = failure.as_label(),
                            "supervisor shutdown did not confirm, halting"
                        );
                        core.halt();
                    }
                } else {
                    match &response.error {
                        None => core.remove_actor_later(subject.id()),
                        Some(failure) => {
                            error!(
                                actor = ?subject,
                                error = failure.as_label(),
                                "actor shutdown timed out, forcing"
                            );
                            core.force_shutdown_later(subject.id());
                        }
                    }
                }
                if cell.base().state() == ActorState::ShuttingDown {
                    cell.shutdown_continue(core);
                }
            },
        );
        actor.subscribe_point(core, on_shutdown_response, &address);

        // Foreign supervisors recording subscriptions on our addresses.
        let on_external_subscription = Handler::system::<ExternalSubscription, _>(
            address.clone(),
            |_cell, external, core| core.subscribe(external.point.clone()),
        );
        actor.subscribe_point(core, on_external_subscription, &address);

        // Foreign supervisors retiring subscriptions on our addresses: drop
        // the entry and confirm the commit back to the owner's supervisor.
        let on_external_unsubscription = Handler::system::<ExternalUnsubscription, _>(
            address.clone(),
            |_cell, external, core| {
                core.subscriptions.remove(&external.point);
                let home = external.point.handler.owner().supervisor_address();
                let commit = CommitUnsubscription {
                    point: external.point.clone(),
                };
                home.deliver_or_log(Envelope::new(home.clone(), commit));
            },
        );
        actor.subscribe_point(core, on_external_unsubscription, &address);

        // The foreign side has dropped the point; issue the confirmation to
        // the owning actor, reuniting it with its parked callback.
        let on_commit = Handler::system::<CommitUnsubscription, _>(
            address.clone(),
            |_cell, commit, core| {
                let callback = core.take_parked_unsubscribe(commit.point.key());
                let owner = commit.point.handler.owner().clone();
                let confirmation =
                    UnsubscriptionConfirmation::new(commit.point.clone(), callback);
                owner.deliver_or_log(Envelope::new(owner.clone(), confirmation));
            },
        );
        actor.subscribe_point(core, on_commit, &address);

        Ok(())
    }

    /// Cascade: ask every owned actor to shut down, then hold the phase
    /// until all confirmations (or forced teardowns) have drained the child
    /// list.
    fn handle_shutdown(
        &mut self,
        actor: &mut crate::actor::ActorBase,
        core: &mut SupervisorCore,
    ) -> bool {
        if !core.cascade_started {
            core.cascade_started = true;
            for child in core.children.clone() {
                if core.shutting.insert(child.address.id()) {
                    let request = ShutdownRequest {
                        actor_address: child.address.clone(),
                    };
                    let _ =
                        actor.send_request(core, &child.address, request, child.shutdown_timeout);
                }
            }
        }
        core.children.is_empty()
    }
}

/// Configuration for [`Supervisor::spawn`].
pub struct SupervisorConfig {
    pub(crate) name: String,
    pub(crate) init_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) timer: Option<Box<dyn TimerBackend>>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            name: "supervisor".to_string(),
            init_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
            timer: None,
        }
    }
}

impl SupervisorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the supervisor for tracing output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Init timeout for the supervisor's own lifecycle.
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// How long the supervisor waits for its shutdown cascade before
    /// halting anyway.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Swaps the timer backend; defaults to [`TokioTimer`].
    pub fn timer(mut self, timer: impl TimerBackend + 'static) -> Self {
        self.timer = Some(Box::new(timer));
        self
    }
}

impl fmt::Debug for SupervisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorConfig")
            .field("name", &self.name)
            .field("init_timeout", &self.init_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

/// An actor that owns a delivery queue bound to one event loop, creates
/// addresses, runs dispatch, and drives the lifecycle of its actors.
pub struct Supervisor {
    name: String,
    core: SupervisorCore,
    actors: HashMap<u64, ActorCell>,
    inbox: DeliveryQueue,
    init_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Supervisor {
    /// Spawns a supervisor on its own tokio task and returns the handle for
    /// talking to it. All supervised state lives inside the task; the handle
    /// only carries the queue.
    pub fn spawn(mut config: SupervisorConfig) -> SupervisorHandle {
        let supervisor_id = NEXT_SUPERVISOR_ID.fetch_add(1, Ordering::Relaxed);
        let (sink, inbox) = tokio::sync::mpsc::unbounded_channel();
        let link = SupervisorLink::new(supervisor_id, sink);
        let address = link.supervisor_address();
        let timers = config
            .timer
            .take()
            .unwrap_or_else(|| Box::new(TokioTimer::default()));

        let supervisor = Supervisor {
            name: config.name.clone(),
            core: SupervisorCore::new(supervisor_id, address.clone(), link, timers),
            actors: HashMap::new(),
            inbox,
            init_timeout: config.init_timeout,
            shutdown_timeout: config.shutdown_timeout,
        };

        let tracker = TaskTracker::new();
        tracker.spawn(supervisor.run());
        tracker.close();

        SupervisorHandle { address, tracker }
    }

    #[instrument(name = "supervisor", skip(self), fields(name = %self.name, id = self.core.supervisor_id()))]
    async fn run(mut self) {
        if let Err(failure) = self.bootstrap() {
            error!(error = %failure, "supervisor failed to bootstrap");
            return;
        }
        while let Some(envelope) = self.inbox.recv().await {
            self.process(envelope);
            self.apply_ops();
            if self.core.halted() {
                break;
            }
        }
        trace!("supervisor loop finished");
    }

    /// Builds the supervisor's own cell and drives it into the lifecycle the
    /// same way it will drive its children: plugins activate synchronously,
    /// the init request goes through the queue with the init watchdog armed.
    fn bootstrap(&mut self) -> Result<(), ErrorKind> {
        let address = self.core.supervisor_address();
        let config = ActorConfig::new()
            .init_timeout(self.init_timeout)
            .shutdown_timeout(self.shutdown_timeout)
            .plugin(SupervisingPlugin);
        let mut cell = ActorCell::new(SupervisorActor, address.clone(), address.clone(), config);
        cell.initialize(&mut self.core)?;
        let init_timeout = self.init_timeout;
        let request = InitRequest {
            actor_address: address.clone(),
        };
        let _ = cell
            .base_mut()
            .send_request(&mut self.core, &address, request, init_timeout)?;
        self.actors.insert(address.id(), cell);
        Ok(())
    }

    fn process(&mut self, envelope: Envelope) {
        if envelope.destination().id() == self.core.supervisor_address().id() {
            if let Some(create) = envelope.payload_as::<CreateActor>() {
                self.handle_create(create);
                return;
            }
            if let Some(call) = envelope.payload_as::<HandlerCall>() {
                self.handle_handler_call(call);
                return;
            }
            if let Some(query) = envelope.payload_as::<RequestEnvelope<StateQuery>>() {
                self.handle_state_query(query);
                return;
            }
        }
        self.deliver(envelope);
    }

    /// Takes ownership of a handed-over actor: initialize it (activation +
    /// user configure), register it as a child, and issue the init request
    /// with the actor's init timeout armed.
    fn handle_create(&mut self, create: &CreateActor) {
        let address = create.address.clone();
        if self.own_state() >= ActorState::ShuttingDown {
            warn!(actor = ?address, "supervisor is shutting down, refusing new actor");
            return;
        }
        let Some(mut cell) = create.cell.lock().expect("create payload lock").take() else {
            warn!(actor = ?address, "create message already consumed");
            return;
        };
        match cell.initialize(&mut self.core) {
            Err(failure) => {
                // Activation failure is fatal before the actor ever ran; the
                // deactivation pass has already unwound its registrations.
                error!(actor = ?address, error = %failure, "actor discarded");
            }
            Ok(()) => {
                let init_timeout = cell.base().init_timeout;
                let shutdown_timeout = cell.base().shutdown_timeout;
                self.actors.insert(address.id(), cell);
                self.core.children.push(ChildRecord {
                    address: address.clone(),
                    shutdown_timeout,
                });
                let own = self.core.supervisor_address();
                let supervisor_cell = self
                    .actors
                    .get_mut(&own.id())
                    .expect("supervisor cell is always registered");
                let request = InitRequest {
                    actor_address: address.clone(),
                };
                let _ = supervisor_cell.base_mut().send_request(
                    &mut self.core,
                    &address,
                    request,
                    init_timeout,
                );
            }
        }
    }

    /// A foreign supervisor forwarded a message for a handler whose owner
    /// lives here: invoke it locally.
    fn handle_handler_call(&mut self, call: &HandlerCall) {
        let owner = call.handler.owner();
        match self.actors.get_mut(&owner.id()) {
            Some(cell) => call.handler.invoke(cell, &call.origin, &mut self.core),
            None => trace!(
                owner = ?owner,
                message = call.origin.type_name(),
                "handler owner is gone, dropping forwarded call"
            ),
        }
    }

    fn handle_state_query(&mut self, query: &RequestEnvelope<StateQuery>) {
        let state = self
            .actors
            .get(&query.payload.subject.id())
            .map(|cell| cell.base().state())
            .unwrap_or(ActorState::ShutDown);
        query.reply(StateReport { state });
    }

    /// Registry dispatch: every handler on the destination address sees the
    /// message in registration order. Handlers owned by foreign actors are
    /// wrapped as handler calls and hop onto their owning supervisor's
    /// queue.
    fn deliver(&mut self, envelope: Envelope) {
        let handlers = self
            .core
            .matching(envelope.destination().id(), envelope.tag());
        if handlers.is_empty() {
            trace!(
                destination = ?envelope.destination(),
                message = envelope.type_name(),
                "no subscribed handler, dropping"
            );
            return;
        }
        for handler in handlers {
            if handler.owner().supervisor_id() == self.core.supervisor_id() {
                match self.actors.get_mut(&handler.owner().id()) {
                    Some(cell) => handler.invoke(cell, &envelope, &mut self.core),
                    None => trace!(owner = ?handler.owner(), "handler owner is gone"),
                }
            } else {
                let foreign = handler.owner().supervisor_address();
                let call = HandlerCall {
                    origin: envelope.clone(),
                    handler,
                };
                foreign.deliver_or_log(Envelope::new(foreign.clone(), call));
            }
        }
    }

    fn apply_ops(&mut self) {
        while let Some(op) = self.core.ops.pop() {
            match op {
                CoreOp::RemoveActor(actor) => {
                    self.actors.remove(&actor);
                }
                CoreOp::ForceShutdown(actor) => {
                    if let Some(mut cell) = self.actors.remove(&actor) {
                        cell.force_shutdown(&mut self.core);
                    }
                }
            }
        }
    }

    fn own_state(&self) -> ActorState {
        self.actors
            .get(&self.core.supervisor_address().id())
            .map(|cell| cell.base().state())
            .unwrap_or(ActorState::ShutDown)
    }
}

/// Cloneable handle to a spawned supervisor: spawn actors on it, mint
/// addresses, trigger shutdown, and await termination.
#[derive(Clone)]
pub struct SupervisorHandle {
    address: Address,
    tracker: TaskTracker,
}

impl SupervisorHandle {
    /// The supervisor's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Mints a fresh address owned by this supervisor.
    pub fn create_address(&self) -> Address {
        self.address.link().mint()
    }

    /// Builds the actor's cell and hands it to the supervisor. The returned
    /// address is live immediately; messages sent to it queue up behind the
    /// actor's initialization.
    pub fn spawn_actor<A: Actor>(&self, actor: A, config: ActorConfig) -> Address {
        let address = self.create_address();
        let cell = ActorCell::new(actor, address.clone(), self.address.clone(), config);
        let create = CreateActor {
            cell: Mutex::new(Some(cell)),
            address: address.clone(),
        };
        self.address
            .deliver_or_log(Envelope::new(self.address.clone(), create));
        address
    }

    /// Asks the supervisor to begin shutdown of one of its actors.
    pub fn shutdown_actor(&self, actor: &Address) {
        let trigger = ShutdownTrigger {
            actor_address: actor.clone(),
        };
        self.address
            .deliver_or_log(Envelope::new(self.address.clone(), trigger));
    }

    /// Asks the supervisor to shut down: every owned actor is asked to shut
    /// down first, and the loop halts once all of them confirmed or timed
    /// out. Use [`await_terminated`](Self::await_terminated) to join.
    pub fn shutdown(&self) {
        let trigger = ShutdownTrigger {
            actor_address: self.address.clone(),
        };
        self.address
            .deliver_or_log(Envelope::new(self.address.clone(), trigger));
    }

    /// Waits until the supervisor's loop has finished.
    pub async fn await_terminated(&self) {
        self.tracker.wait().await;
    }
}

impl fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("address", &self.address)
            .finish()
    }
}
