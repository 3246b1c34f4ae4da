// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::protocol::{RequestId, Stream};
use thiserror::Error;

/// Violations of the scatter/gather protocol. Always fatal for the worker
/// instance that detects them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The source reused a request id that is still being tracked.
    #[error("Request '{0}' is already in progress")]
    DuplicateRequest(RequestId),

    /// A terminal result arrived for a request nobody is tracking.
    #[error("Completion for '{0}' is not associated with any tracked request")]
    OrphanedCompletion(RequestId),

    /// A stage that accepts exactly one count message per request got another.
    #[error("Stage '{stage}' received more than one count message for '{request_id}'")]
    DuplicateCount { stage: String, request_id: RequestId },

    /// Serialized mode needed to release a request but its queue was empty.
    #[error("Release queue empty after '{0}' completed; {1} request(s) never arrived")]
    EmptyReleaseQueue(RequestId, usize),

    /// A count field did not hold a non-negative integer.
    #[error("Malformed count '{value}' for '{request_id}'")]
    MalformedCount { request_id: RequestId, value: String },

    /// A stage was handed a stream it does not subscribe to.
    #[error("Stage '{stage}' cannot handle stream {stream:?} from '{source_component}'")]
    UnexpectedStream {
        stage: String,
        stream: Stream,
        source_component: String,
    },
}
