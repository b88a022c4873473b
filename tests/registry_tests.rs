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

use std::time::Duration;

use apiary::prelude::*;
use tokio::sync::mpsc;

use crate::setup::{expect_event, initialize_tracing};

mod setup;

/// Drives the whole registry flow from inside the actor system and reports
/// each outcome: register, duplicate register, discover, deregister by
/// address, discover again.
struct RegistryScript {
    events: mpsc::UnboundedSender<String>,
    registry: Address,
    db: Address,
    other: Address,
    registrations: u32,
    discovered_once: bool,
}

impl RegistryScript {
    fn new(
        events: mpsc::UnboundedSender<String>,
        registry: Address,
        db: Address,
        other: Address,
    ) -> Self {
        RegistryScript {
            events,
            registry,
            db,
            other,
            registrations: 0,
            discovered_once: false,
        }
    }
}

impl Actor for RegistryScript {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        ctx.subscribe_response::<RegistryScript, RegistrationRequest, _>(|me, response, ctx| {
            let label = response
                .error
                .as_ref()
                .map(ErrorKind::as_label)
                .unwrap_or("ok");
            let _ = me.events.send(format!("register:{label}"));
            me.registrations += 1;
            let registry = me.registry.clone();
            match me.registrations {
                1 => {
                    // Second registration under the taken name must fail.
                    let other = me.other.clone();
                    let _ = ctx
                        .request(
                            &registry,
                            RegistrationRequest {
                                name: "db".into(),
                                service: other,
                            },
                        )
                        .send(Duration::from_secs(1));
                }
                2 => {
                    let _ = ctx
                        .request(&registry, DiscoveryRequest { name: "db".into() })
                        .send(Duration::from_secs(1));
                }
                _ => {}
            }
        });

        ctx.subscribe_response::<RegistryScript, DiscoveryRequest, _>(|me, response, ctx| {
            match (&response.error, &response.payload) {
                (None, Some(reply)) => {
                    let which = if reply.service == me.db { "db" } else { "other" };
                    let _ = me.events.send(format!("discovered:{which}"));
                    if !me.discovered_once {
                        me.discovered_once = true;
                        // Deregister every name of the db address, then look
                        // it up again; FIFO on the registry's supervisor
                        // keeps these ordered.
                        let registry = me.registry.clone();
                        let db = me.db.clone();
                        let _ = ctx.send(&registry, DeregisterNotify { service: db });
                        let _ = ctx
                            .request(&registry, DiscoveryRequest { name: "db".into() })
                            .send(Duration::from_secs(1));
                    }
                }
                (Some(error), _) => {
                    let _ = me.events.send(format!("discovery_error:{}", error.as_label()));
                }
                (None, None) => {}
            }
        });
    }

    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let registry = self.registry.clone();
        let db = self.db.clone();
        let _ = ctx
            .request(
                &registry,
                RegistrationRequest {
                    name: "db".into(),
                    service: db,
                },
            )
            .send(Duration::from_secs(1));
    }
}

/// The literal registry scenario: "db" registers once, the duplicate is
/// refused, discovery finds the first address, deregistration by address
/// empties the name, and the next discovery misses.
#[tokio::test]
async fn registry_flow_register_discover_deregister() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("registry"));
    let registry = supervisor.spawn_actor(Registry::default(), ActorConfig::new());
    let db = supervisor.create_address();
    let other = supervisor.create_address();

    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        RegistryScript::new(events, registry, db, other),
        ActorConfig::new(),
    );

    assert_eq!(expect_event(&mut probe, Duration::from_secs(1)).await, "register:ok");
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "register:name_already_registered"
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "discovered:db"
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "discovery_error:service_not_found"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}

/// Removing a single name leaves other names of the same service intact.
struct SingleNameScript {
    events: mpsc::UnboundedSender<String>,
    registry: Address,
    db: Address,
    step: u32,
}

impl Actor for SingleNameScript {
    fn configure(&mut self, ctx: &mut ActorContext<'_>) {
        ctx.subscribe_response::<SingleNameScript, RegistrationRequest, _>(|me, _response, ctx| {
            me.step += 1;
            let registry = me.registry.clone();
            match me.step {
                1 => {
                    let db = me.db.clone();
                    let _ = ctx
                        .request(
                            &registry,
                            RegistrationRequest {
                                name: "db-replica".into(),
                                service: db,
                            },
                        )
                        .send(Duration::from_secs(1));
                }
                2 => {
                    let _ = ctx.send(&registry, DeregisterService { name: "db".into() });
                    let _ = ctx
                        .request(&registry, DiscoveryRequest { name: "db".into() })
                        .send(Duration::from_secs(1));
                }
                _ => {}
            }
        });
        ctx.subscribe_response::<SingleNameScript, DiscoveryRequest, _>(|me, response, ctx| {
            match &response.error {
                Some(error) => {
                    let _ = me.events.send(format!("miss:{}", error.as_label()));
                    // The replica name must still resolve.
                    let registry = me.registry.clone();
                    let _ = ctx
                        .request(
                            &registry,
                            DiscoveryRequest {
                                name: "db-replica".into(),
                            },
                        )
                        .send(Duration::from_secs(1));
                }
                None => {
                    let _ = me.events.send("hit:db-replica".to_string());
                }
            }
        });
    }

    fn on_start(&mut self, ctx: &mut ActorContext<'_>) {
        let registry = self.registry.clone();
        let db = self.db.clone();
        let _ = ctx
            .request(
                &registry,
                RegistrationRequest {
                    name: "db".into(),
                    service: db,
                },
            )
            .send(Duration::from_secs(1));
    }
}

#[tokio::test]
async fn deregistering_one_name_keeps_the_rest() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("registry-names"));
    let registry = supervisor.spawn_actor(Registry::default(), ActorConfig::new());
    let db = supervisor.create_address();

    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        SingleNameScript {
            events,
            registry,
            db,
            step: 0,
        },
        ActorConfig::new(),
    );

    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "miss:service_not_found"
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "hit:db-replica"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}
