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

use tracing::trace;

use crate::actor::ActorBase;
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{SubscriptionConfirmation, UnsubscriptionConfirmation};
use crate::plugin::{Plugin, PollOutcome, Slot};
use crate::supervisor::SupervisorCore;

/// Owns the actor's subscription points across the whole lifecycle.
///
/// Initialization is held until every point made during configuration has
/// been confirmed. Shutdown retires points one at a time in reverse
/// subscription order, which guarantees the confirmation handlers installed
/// here — first of all points — are the last to go and can still process the
/// retirement of every other point, including their own.
pub(crate) struct SubscriptionsPlugin;

impl Plugin for SubscriptionsPlugin {
    fn identity(&self) -> &'static str {
        "subscriptions"
    }

    fn slots(&self) -> &'static [Slot] {
        &[Slot::Init, Slot::Shutdown, Slot::Subscription, Slot::Unsubscription]
    }

    fn activate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        let address = actor.address().clone();

        // The unsubscription handler is the very first point of the actor:
        // the shutdown drain runs in reverse subscription order, and this
        // point must outlive every other so their retirement confirmations
        // can still be processed. Its own confirmation is the final message;
        // the registry entry survives until that confirmation commits.
        let on_unsubscribed = Handler::system::<UnsubscriptionConfirmation, _>(
            address.clone(),
            |cell, confirmation, core| cell.on_unsubscription(confirmation, core),
        );
        actor.subscribe_point(core, on_unsubscribed, &address);

        let on_subscribed = Handler::system::<SubscriptionConfirmation, _>(
            address.clone(),
            |cell, confirmation, core| cell.on_subscription(confirmation, core),
        );
        actor.subscribe_point(core, on_subscribed, &address);

        Ok(())
    }

    /// The activation-failure teardown path: the confirmation ceremony never
    /// ran, so leftover points are discarded straight from the registry.
    fn deactivate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) {
        for point in std::mem::take(&mut actor.subscription_points) {
            core.discard_subscription(&point);
        }
        actor.pending_subscriptions = 0;
    }

    fn handle_init(&mut self, actor: &mut ActorBase, _core: &mut SupervisorCore) -> bool {
        actor.pending_subscriptions == 0
    }

    fn handle_shutdown(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> bool {
        if actor.subscription_points.is_empty() {
            return true;
        }
        if !actor.unsubscribe_in_flight {
            actor.unsubscribe_in_flight = true;
            let point = actor
                .subscription_points
                .last()
                .expect("checked non-empty")
                .clone();
            trace!(actor = ?actor.address(), point = ?point, "retiring subscription point");
            core.unsubscribe(point, None);
        }
        false
    }

    fn handle_subscription(
        &mut self,
        _confirmation: &SubscriptionConfirmation,
        actor: &mut ActorBase,
        _core: &mut SupervisorCore,
    ) -> PollOutcome {
        actor.pending_subscriptions = actor.pending_subscriptions.saturating_sub(1);
        PollOutcome::Consumed
    }

    fn handle_unsubscription(
        &mut self,
        confirmation: &UnsubscriptionConfirmation,
        actor: &mut ActorBase,
        _core: &mut SupervisorCore,
    ) -> PollOutcome {
        let key = confirmation.point.key();
        if let Some(position) = actor
            .subscription_points
            .iter()
            .rposition(|point| point.key() == key)
        {
            actor.subscription_points.remove(position);
        }
        actor.unsubscribe_in_flight = false;
        PollOutcome::Consumed
    }
}
