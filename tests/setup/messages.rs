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

use apiary::prelude::*;

/// Request kind used across the probe actors.
#[derive(Debug, Clone)]
pub struct Ping {
    pub value: u32,
}

/// Response kind paired with [`Ping`].
#[derive(Debug)]
pub struct Pong {
    pub value: u32,
}

impl Request for Ping {
    type Response = Pong;
}

/// Plain payload for subscription tests.
#[derive(Debug, Clone)]
pub struct Note {
    pub text: String,
}

/// Tells a [`super::Mute`] actor to answer everything it swallowed.
#[derive(Debug, Clone)]
pub struct Flush;

/// Tells a [`super::Recorder`] to unsubscribe its note handler.
#[derive(Debug, Clone)]
pub struct Detach;

/// Tells a [`super::LinkClient`] to unlink from its server.
#[derive(Debug, Clone)]
pub struct DropLink;
