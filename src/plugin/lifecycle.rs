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

use crate::actor::ActorBase;
use crate::error::ErrorKind;
use crate::handler::Handler;
use crate::message::{InitRequest, RequestEnvelope, ShutdownRequest, StartTrigger};
use crate::plugin::{Plugin, Slot};
use crate::supervisor::SupervisorCore;

/// Installs the actor's lifecycle handlers: the init request, the start
/// trigger, and the shutdown request all arrive through the normal queue and
/// land here.
pub(crate) struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn identity(&self) -> &'static str {
        "lifecycle"
    }

    fn slots(&self) -> &'static [Slot] {
        &[Slot::Init, Slot::Shutdown]
    }

    fn activate(&mut self, actor: &mut ActorBase, core: &mut SupervisorCore) -> Result<(), ErrorKind> {
        let address = actor.address().clone();

        let on_init = Handler::system::<RequestEnvelope<InitRequest>, _>(
            address.clone(),
            |cell, request, core| cell.begin_init(request.clone(), core),
        );
        actor.subscribe_point(core, on_init, &address);

        let on_start = Handler::system::<StartTrigger, _>(address.clone(), |cell, _trigger, core| {
            cell.start(core)
        });
        actor.subscribe_point(core, on_start, &address);

        let on_shutdown = Handler::system::<RequestEnvelope<ShutdownRequest>, _>(
            address.clone(),
            |cell, request, core| cell.begin_shutdown(request.clone(), core),
        );
        actor.subscribe_point(core, on_shutdown, &address);

        Ok(())
    }
}
