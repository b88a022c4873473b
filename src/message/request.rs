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

//! Request/response payload wrappers.
//!
//! A payload kind becomes a *request kind* by implementing [`Request`],
//! naming its companion response kind. On the wire a request travels as a
//! [`RequestEnvelope`] carrying the reply address and a correlation id, and
//! the answer travels back as a [`ResponseEnvelope`] carrying the same id.
//! For every outstanding request exactly one of {typed response, timeout
//! response} is delivered; the loser of any race finds the in-flight entry
//! gone and is dropped silently.

use crate::address::Address;
use crate::error::ErrorKind;
use crate::message::{Envelope, Payload};

/// Correlation id, unique within the originating actor.
///
/// Allocation is monotonically increasing per actor; 64 bits preclude
/// wraparound in practice.
pub type RequestId = u64;

/// A payload kind that expects a typed response.
///
/// `Clone` is required so the originating request can be re-carried inside
/// synthesized timeout responses; request kinds are plain records, so the
/// derive is free.
pub trait Request: Payload + Clone {
    /// The companion response kind.
    type Response: Payload;
}

/// Wire form of an outbound request: the user payload plus the reply address
/// and correlation id.
#[derive(Debug, Clone)]
pub struct RequestEnvelope<R: Request> {
    /// Address of the originating actor; the response is delivered here.
    pub reply_to: Address,
    /// Correlation id, unique within the originating actor.
    pub request_id: RequestId,
    /// The request payload itself.
    pub payload: R,
}

impl<R: Request> RequestEnvelope<R> {
    /// Answers this request with a successful response.
    pub fn reply(&self, response: R::Response) {
        self.respond(None, Some(response));
    }

    /// Answers this request with an error and no payload.
    pub fn reply_with_error(&self, error: ErrorKind) {
        self.respond(Some(error), None);
    }

    fn respond(&self, error: Option<ErrorKind>, payload: Option<R::Response>) {
        let response = ResponseEnvelope {
            request_id: self.request_id,
            error,
            request: self.clone(),
            payload,
        };
        self.reply_to
            .deliver_or_log(Envelope::new(self.reply_to.clone(), response));
    }
}

/// Wire form of a response, correlated to its request by id.
///
/// The full originating [`RequestEnvelope`] rides along so that observers can
/// recover the subject of a request from its response alone; a timed-out
/// init request, for example, still names the actor that stalled.
#[derive(Debug)]
pub struct ResponseEnvelope<R: Request> {
    /// Correlation id copied from the request.
    pub request_id: RequestId,
    /// Error code, or `None` on success.
    pub error: Option<ErrorKind>,
    /// The request this response answers.
    pub request: RequestEnvelope<R>,
    /// The response payload; absent on error responses.
    pub payload: Option<R::Response>,
}

impl<R: Request> ResponseEnvelope<R> {
    /// Builds the synthesized response delivered when the request deadline
    /// fires or the destination supervisor is gone.
    pub(crate) fn failure(request: RequestEnvelope<R>, error: ErrorKind) -> Self {
        ResponseEnvelope {
            request_id: request.request_id,
            error: Some(error),
            request,
            payload: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SupervisorLink;

    #[derive(Debug, Clone)]
    struct Probe;

    #[derive(Debug)]
    struct ProbeAck;

    impl Request for Probe {
        type Response = ProbeAck;
    }

    #[test]
    fn reply_is_delivered_to_the_reply_address() {
        let (sink, mut queue) = tokio::sync::mpsc::unbounded_channel();
        let reply_to = SupervisorLink::new(1, sink).mint();
        let request = RequestEnvelope {
            reply_to: reply_to.clone(),
            request_id: 9,
            payload: Probe,
        };

        request.reply(ProbeAck);

        let env = queue.try_recv().expect("response enqueued");
        assert_eq!(env.destination(), &reply_to);
        let response = env.payload_as::<ResponseEnvelope<Probe>>().unwrap();
        assert_eq!(response.request_id, 9);
        assert!(response.error.is_none());
        assert!(response.payload.is_some());
    }

    #[test]
    fn failure_response_carries_the_request() {
        let (sink, _queue) = tokio::sync::mpsc::unbounded_channel();
        let reply_to = SupervisorLink::new(1, sink).mint();
        let request = RequestEnvelope {
            reply_to,
            request_id: 3,
            payload: Probe,
        };
        let response = ResponseEnvelope::failure(request, ErrorKind::RequestTimeout);
        assert_eq!(response.request_id, 3);
        assert_eq!(response.error, Some(ErrorKind::RequestTimeout));
        assert!(response.payload.is_none());
        assert_eq!(response.request.request_id, 3);
    }
}
