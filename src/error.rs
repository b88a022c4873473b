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

//! Error taxonomy of the framework.
//!
//! Errors in request/response flows travel in the `error` field of a
//! [`ResponseEnvelope`](crate::message::ResponseEnvelope) and are never raised
//! as side-channel panics. Errors during dispatch of plain (non-request)
//! messages are logged and the message is dropped.

use thiserror::Error;

/// Everything that can go wrong inside the framework, as observed by users
/// through response messages or lifecycle transitions of their own actors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response arrived within the deadline given to `request(..).send`.
    #[error("no response within the request deadline")]
    RequestTimeout,

    /// The destination address has no live owning supervisor.
    #[error("destination supervisor is no longer running")]
    DispatchFailed,

    /// The server actor refuses links (it has no unlink timeout configured).
    #[error("actor does not accept links")]
    ActorNotLinkable,

    /// A registry name is already mapped to a service address.
    #[error("service name '{name}' is already registered")]
    NameAlreadyRegistered {
        /// The contested service name.
        name: String,
    },

    /// A registry lookup found no mapping for the requested name.
    #[error("no service registered under '{name}'")]
    ServiceNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A plugin failed to activate; the actor cascades into shutdown.
    #[error("plugin '{plugin}' failed to activate")]
    PluginActivationFailed {
        /// Identity tag of the failing plugin.
        plugin: &'static str,
    },

    /// An operation was attempted on an actor that has already shut down.
    #[error("actor has already shut down")]
    StillShuttingDown,
}

impl ErrorKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::RequestTimeout => "request_timeout",
            ErrorKind::DispatchFailed => "dispatch_failed",
            ErrorKind::ActorNotLinkable => "actor_not_linkable",
            ErrorKind::NameAlreadyRegistered { .. } => "name_already_registered",
            ErrorKind::ServiceNotFound { .. } => "service_not_found",
            ErrorKind::PluginActivationFailed { .. } => "plugin_activation_failed",
            ErrorKind::StillShuttingDown => "still_shutting_down",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ErrorKind::RequestTimeout.as_label(), "request_timeout");
        assert_eq!(ErrorKind::DispatchFailed.as_label(), "dispatch_failed");
        assert_eq!(
            ErrorKind::NameAlreadyRegistered { name: "db".into() }.as_label(),
            "name_already_registered"
        );
        assert_eq!(
            ErrorKind::PluginActivationFailed { plugin: "lifecycle" }.as_label(),
            "plugin_activation_failed"
        );
    }
}
