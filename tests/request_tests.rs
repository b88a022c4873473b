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

use crate::setup::{expect_event, expect_silence, initialize_tracing, Echo, Flush, Mute, Requester};

mod setup;

/// Round trip: a request to a responsive actor yields its typed response.
#[tokio::test]
async fn request_is_answered_with_typed_response() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("request"));
    let echo = supervisor.spawn_actor(Echo, ActorConfig::new());

    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        Requester::new(events, echo, Duration::from_secs(1)),
        ActorConfig::new(),
    );

    assert_eq!(expect_event(&mut probe, Duration::from_secs(1)).await, "pong:7");

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}

/// A request nobody answers times out with `request_timeout`, and the late
/// reply — arriving after the correlation is gone — is dropped silently.
#[tokio::test]
async fn timeout_wins_and_late_reply_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("timeout"));
    let mute = supervisor.spawn_actor(Mute::default(), ActorConfig::new());

    let (events, mut probe) = mpsc::unbounded_channel();
    let began = Instant::now();
    supervisor.spawn_actor(
        Requester::new(events, mute.clone(), Duration::from_millis(50)),
        ActorConfig::new(),
    );

    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "error:request_timeout"
    );
    assert!(
        began.elapsed() >= Duration::from_millis(40),
        "timeout fired before the deadline"
    );

    // Flush the mute actor so it answers the long-dead request; the
    // correlator must drop the response without a second delivery.
    mute.send(Flush)?;
    expect_silence(&mut probe, Duration::from_millis(150)).await;

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}

/// A request to an address whose supervisor has terminated is answered with
/// `dispatch_failed` instead of waiting out the deadline.
#[tokio::test]
async fn dead_destination_yields_dispatch_failed() -> anyhow::Result<()> {
    initialize_tracing();
    let graveyard = Supervisor::spawn(SupervisorConfig::new().name("graveyard"));
    let orphan = graveyard.create_address();
    graveyard.shutdown();
    graveyard.await_terminated().await;

    let supervisor = Supervisor::spawn(SupervisorConfig::new().name("requester"));
    let (events, mut probe) = mpsc::unbounded_channel();
    supervisor.spawn_actor(
        Requester::new(events, orphan, Duration::from_secs(5)),
        ActorConfig::new(),
    );

    assert_eq!(
        expect_event(&mut probe, Duration::from_secs(1)).await,
        "error:dispatch_failed"
    );

    supervisor.shutdown();
    supervisor.await_terminated().await;
    Ok(())
}
