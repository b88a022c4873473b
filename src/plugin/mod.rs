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

//! The plugin pipeline that incrementally drives actor transitions.
//!
//! Plugins occupy slots. The init slot is consumed front-to-back, the
//! shutdown slot back-to-front (LIFO with respect to init); the first plugin
//! that answers `false` suspends the phase until some later event re-polls
//! it. Subscription and unsubscription confirmations are polled across their
//! slot in reverse order with [`PollOutcome`] controlling the walk.
//!
//! Activation asks every plugin in parallel (install order); each commits
//! its outcome, and any failure cascades a reverse-order deactivation.

use crate::actor::ActorBase;
use crate::error::ErrorKind;
use crate::message::{SubscriptionConfirmation, UnsubscriptionConfirmation};
use crate::supervisor::SupervisorCore;

mod lifecycle;
mod link;
mod subscriptions;

pub(crate) use lifecycle::LifecyclePlugin;
pub(crate) use link::LinkPlugin;
pub(crate) use subscriptions::SubscriptionsPlugin;

/// The lifecycle slots a plugin can participate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Consulted front-to-back while the actor initializes.
    Init,
    /// Consulted back-to-front while the actor shuts down.
    Shutdown,
    /// Polled on every subscription confirmation.
    Subscription,
    /// Polled on every unsubscription confirmation.
    Unsubscription,
}

/// Outcome of a subscription/unsubscription slot poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not interested; keep polling the remaining plugins.
    Ignored,
    /// Handled; stop polling, keep the plugin in the slot.
    Consumed,
    /// Handled for the last time; remove the plugin from the slot and keep
    /// polling.
    Finished,
}

/// A modular participant in an actor's init/shutdown/subscription lifecycle.
///
/// Plugins expose the subset of slots they participate in via
/// [`slots`](Plugin::slots) and are installed into exactly those slots when
/// they activate. All methods run on the owning supervisor's loop with the
/// actor's framework state and the supervisor core borrowed; plugins never
/// suspend.
pub trait Plugin: Send + 'static {
    /// Stable identity tag, used for activation bookkeeping and logs.
    fn identity(&self) -> &'static str;

    /// The slots this plugin participates in.
    fn slots(&self) -> &'static [Slot];

    /// Called once when the owning actor activates its plugins; subscribing
    /// the actor's handlers happens here. An error cascades deactivation and
    /// moves the actor straight into shutdown.
    fn activate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        let _ = (actor, core);
        Ok(())
    }

    /// Called in reverse install order when activation fails or the actor is
    /// being torn down.
    fn deactivate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) {
        let _ = (actor, core);
    }

    /// One step of the init phase. `true` releases this plugin from the init
    /// slot; `false` suspends initialization until re-polled.
    fn handle_init(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> bool {
        let _ = (actor, core);
        true
    }

    /// One step of the shutdown phase, mirror of
    /// [`handle_init`](Plugin::handle_init).
    fn handle_shutdown(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> bool {
        let _ = (actor, core);
        true
    }

    /// Polled when a subscription confirmation reaches the owning actor.
    fn handle_subscription(
        &mut self,
        confirmation: &SubscriptionConfirmation,
        actor: &mut ActorBase,
        core: &mut SupervisorCore,
    ) -> PollOutcome {
        let _ = (confirmation, actor, core);
        PollOutcome::Ignored
    }

    /// Polled when an unsubscription confirmation reaches the owning actor.
    fn handle_unsubscription(
        &mut self,
        confirmation: &UnsubscriptionConfirmation,
        actor: &mut ActorBase,
        core: &mut SupervisorCore,
    ) -> PollOutcome {
        let _ = (confirmation, actor, core);
        PollOutcome::Ignored
    }
}
