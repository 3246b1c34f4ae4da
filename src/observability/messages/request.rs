// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the request lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Request origination at the source
//! * Admission, queueing and release in the tracker
//! * End-to-end completion and latency

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A new request left the source.
///
/// # Log Level
/// `debug!` - Routine per-request event
pub struct RequestEmitted<'a> {
    pub request_id: &'a str,
    pub root: &'a str,
}

impl Display for RequestEmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Emitted request '{}' rooted at '{}'", self.request_id, self.root)
    }
}

impl StructuredLog for RequestEmitted<'_> {
    fn log(&self) {
        tracing::debug!(request_id = self.request_id, root = self.root, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "request_emitted",
            span_name = name,
            request_id = self.request_id,
            root = self.root,
        )
    }
}

/// Serialized mode held a request back because another is in flight.
///
/// # Log Level
/// `debug!` - Routine per-request event
pub struct RequestQueued<'a> {
    pub request_id: &'a str,
    pub queue_depth: usize,
}

impl Display for RequestQueued<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Queued request '{}' behind the in-flight request ({} waiting)",
            self.request_id, self.queue_depth
        )
    }
}

impl StructuredLog for RequestQueued<'_> {
    fn log(&self) {
        tracing::debug!(
            request_id = self.request_id,
            queue_depth = self.queue_depth,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "request_queued",
            span_name = name,
            request_id = self.request_id,
            queue_depth = self.queue_depth,
        )
    }
}

/// The tracker admitted a request into the expansion chain.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RequestReleased<'a> {
    pub request_id: &'a str,
    pub root: &'a str,
    pub in_flight: usize,
}

impl Display for RequestReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Released request '{}' (root '{}'), {} in flight",
            self.request_id, self.root, self.in_flight
        )
    }
}

impl StructuredLog for RequestReleased<'_> {
    fn log(&self) {
        tracing::info!(
            request_id = self.request_id,
            root = self.root,
            in_flight = self.in_flight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "request_released",
            span_name = name,
            request_id = self.request_id,
            root = self.root,
            in_flight = self.in_flight,
        )
    }
}

/// A terminal result was correlated back to its request.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use pulse::observability::messages::request::RequestCompleted;
/// use std::time::Duration;
///
/// let msg = RequestCompleted {
///     request_id: "r-7",
///     result: "montage-1f",
///     latency: Duration::from_millis(42),
/// };
///
/// assert_eq!(msg.to_string(), "Completed request 'r-7' -> 'montage-1f' in 42ms");
/// ```
pub struct RequestCompleted<'a> {
    pub request_id: &'a str,
    pub result: &'a str,
    pub latency: Duration,
}

impl Display for RequestCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Completed request '{}' -> '{}' in {:?}",
            self.request_id, self.result, self.latency
        )
    }
}

impl StructuredLog for RequestCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            request_id = self.request_id,
            result = self.result,
            latency_ms = self.latency.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "request_completed",
            span_name = name,
            request_id = self.request_id,
            result = self.result,
            latency = ?self.latency,
        )
    }
}
