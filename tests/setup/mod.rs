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
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

pub use actors::*;
pub use messages::*;

mod actors;
mod messages;

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests. Controlled with
/// `APIARY_TEST_LOG` (standard `EnvFilter` directives); errors only by
/// default so test output stays readable.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("APIARY_TEST_LOG")
            .unwrap_or_else(|_| EnvFilter::new("error"));
        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .compact()
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Waits for the next probe event, failing the test after `within`.
pub async fn expect_event(events: &mut UnboundedReceiver<String>, within: Duration) -> String {
    tokio::time::timeout(within, events.recv())
        .await
        .expect("timed out waiting for a probe event")
        .expect("probe event channel closed")
}

/// Asserts that no probe event arrives for `within`.
pub async fn expect_silence(events: &mut UnboundedReceiver<String>, within: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(within, events.recv()).await {
        panic!("expected silence, got '{event}'");
    }
}
