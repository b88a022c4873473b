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

//! The system-level entry point tracking every spawned supervisor.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{error, trace};

use crate::supervisor::{Supervisor, SupervisorConfig, SupervisorHandle};

/// Tracks top-level supervisors so the whole system can be shut down
/// collectively. Cloneable; clones share the roster.
#[derive(Clone, Default)]
pub struct ActorSystem {
    supervisors: Arc<DashMap<u64, SupervisorHandle>>,
}

impl ActorSystem {
    /// Launches an empty system.
    pub fn launch() -> Self {
        trace!("actor system launched");
        ActorSystem::default()
    }

    /// Spawns a supervisor on its own task and registers it in the roster.
    pub fn spawn_supervisor(&self, config: SupervisorConfig) -> SupervisorHandle {
        let handle = Supervisor::spawn(config);
        self.supervisors
            .insert(handle.address().supervisor_id(), handle.clone());
        handle
    }

    /// Number of supervisors currently registered.
    pub fn supervisor_count(&self) -> usize {
        self.supervisors.len()
    }

    /// Triggers shutdown on every supervisor and waits for all of their
    /// loops to finish, up to `timeout`. Supervisors still running after the
    /// deadline are logged and abandoned.
    pub async fn shutdown_all(&self, timeout: Duration) {
        let handles: Vec<SupervisorHandle> = self
            .supervisors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in &handles {
            handle.shutdown();
        }
        let waits = handles.iter().map(|handle| handle.await_terminated());
        if tokio::time::timeout(timeout, join_all(waits)).await.is_err() {
            error!(
                timeout_ms = timeout.as_millis() as u64,
                "not every supervisor terminated before the system shutdown deadline"
            );
        }
        self.supervisors.clear();
        trace!("actor system shutdown complete");
    }
}
