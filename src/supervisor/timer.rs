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

//! The timer interface a supervisor consumes, and its tokio implementation.
//!
//! A fired timer never runs logic of its own: it re-enters the armed
//! envelope through the owning supervisor's queue, so timeout handling is
//! ordinary message dispatch and the first of {response, timeout} to enter
//! the queue wins any race.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::message::Envelope;

/// Identifies an armed timer for cancellation.
pub type TimerId = u64;

/// External timer interface: arm an envelope for delivery at a deadline, or
/// cancel it. Implementations must deliver fires through the destination's
/// queue, never inline.
pub trait TimerBackend: Send {
    /// Arms `event` for delivery at `deadline`; returns a cancellation id.
    fn arm(&mut self, deadline: Instant, event: Envelope) -> TimerId;

    /// Cancels a previously armed timer. Cancelling an already-fired or
    /// unknown timer is a no-op.
    fn cancel(&mut self, timer_id: TimerId);
}

/// Timer backend running each deadline as a sleeping tokio task.
#[derive(Default)]
pub struct TokioTimer {
    next_id: TimerId,
    tasks: HashMap<TimerId, tokio::task::JoinHandle<()>>,
}

impl TimerBackend for TokioTimer {
    fn arm(&mut self, deadline: Instant, event: Envelope) -> TimerId {
        self.next_id += 1;
        let timer_id = self.next_id;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let destination = event.destination().clone();
            destination.deliver_or_log(event);
        });
        self.tasks.insert(timer_id, task);
        timer_id
    }

    fn cancel(&mut self, timer_id: TimerId) {
        if let Some(task) = self.tasks.remove(&timer_id) {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
