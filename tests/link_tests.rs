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

use std::time::{Duration, Instant};

use apiary::prelude::*;
use tokio::sync::mpsc;

use crate::setup::{expect_event, initialize_tracing, DropLink, LinkClient, Recorder, StateProbe};

mod setup;

/// A server shutting down with a client still linked waits out its unlink
/// deadline, then notifies the client unilaterally; the client observes the
/// notification and drops the server from its linked set.
#[tokio::test]
async fn shutting_down_server_unlinks_unilaterally() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("links"));
    let server = supervisor.spawn_actor(
        Recorder::new(mpsc::unbounded_channel().0),
        ActorConfig::new().unlink_timeout(Duration::from_millis(150)),
    );

    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        LinkClient::new(events, server.clone()),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "link_requested"
    );
    // Give the link round trip a moment to settle before killing the server.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let began = Instant::now();
    supervisor.shutdown_actor(&server);
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(2)).await,
        format!("unlink_notify:{}", server.id())
    );
    assert!(
        began.elapsed() >= Duration::from_millis(120),
        "server unlinked before its deadline"
    );

    // With the linkage cleared the server finishes shutting down.
    let (state_events, mut state_probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        StateProbe::new(state_events, supervisor.address().clone(), server),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut state_probe, Duration::from_secs(1)).await,
        "state:ShutDown"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}

/// A client that unlinks voluntarily releases the server: its shutdown no
/// longer waits for the unlink deadline.
#[tokio::test]
async fn voluntary_unlink_releases_the_server() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("unlink"));
    let server = supervisor.spawn_actor(
        Recorder::new(mpsc::unbounded_channel().0),
        ActorConfig::new().unlink_timeout(Duration::from_secs(10)),
    );

    let (events, mut probe) = mpsc::unbounded_channel();
    let client = supervisor.spawn_actor(
        LinkClient::new(events, server.clone()),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "link_requested"
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.send(DropLink)?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The ten-second unlink deadline must not be needed anymore.
    let began = Instant::now();
    supervisor.shutdown_actor(&server);
    let (state_events, mut state_probe) = mpsc::unbounded_channel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.spawn_actor(
        StateProbe::new(state_events, supervisor.address().clone(), server),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut state_probe, Duration::from_secs(1)).await,
        "state:ShutDown"
    );
    assert!(
        began.elapsed() < Duration::from_secs(5),
        "server shutdown waited for the unlink deadline"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}

/// An actor without an unlink timeout refuses links outright.
#[tokio::test]
async fn unlinkable_server_refuses_links() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("refuse"));
    // Default config: no unlink timeout, not linkable.
    let server = supervisor.spawn_actor(Recorder::new(mpsc::unbounded_channel().0), ActorConfig::new());

    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        LinkClient::new(events, server.clone()),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "link_requested"
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The refused client holds no link, so the server shuts down without
    // any unlink traffic.
    supervisor.shutdown_actor(&server);
    let (state_events, mut state_probe) = mpsc::unbounded_channel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.spawn_actor(
        StateProbe::new(state_events, supervisor.address().clone(), server),
        ActorConfig::new(),
    );
    assert_eq!(
        expect_event(&mut state_probe, Duration::from_secs(1)).await,
        "state:ShutDown"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}
