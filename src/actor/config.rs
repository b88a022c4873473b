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

use std::fmt;
use std::time::Duration;

use crate::plugin::Plugin;

/// Per-actor configuration handed to
/// [`SupervisorHandle::spawn_actor`](crate::supervisor::SupervisorHandle::spawn_actor).
///
/// Timeouts bound the supervisor's init and shutdown watchdogs for this
/// actor. `unlink_timeout` doubles as the link policy: `None` means the
/// actor refuses links entirely, `Some(t)` means a shutting-down server
/// unlinks remaining clients unilaterally after `t`.
pub struct ActorConfig {
    pub(crate) init_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) unlink_timeout: Option<Duration>,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
}

impl Default for ActorConfig {
    fn default() -> Self {
        ActorConfig {
            init_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            unlink_timeout: None,
            plugins: Vec::new(),
        }
    }
}

impl ActorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum time the actor may take to confirm initialization before the
    /// supervisor asks it to shut down.
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Maximum time the actor may take to confirm shutdown before it is
    /// forced into `ShutDown`.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Makes the actor linkable and sets the unilateral-unlink deadline used
    /// during its shutdown.
    pub fn unlink_timeout(mut self, timeout: Duration) -> Self {
        self.unlink_timeout = Some(timeout);
        self
    }

    /// Installs a user plugin after the built-in ones.
    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }
}

impl fmt::Debug for ActorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorConfig")
            .field("init_timeout", &self.init_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("unlink_timeout", &self.unlink_timeout)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
