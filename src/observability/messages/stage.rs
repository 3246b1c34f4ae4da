// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-request tracking inside stateful stages.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// First tuple for a request reached this stage.
///
/// # Log Level
/// `debug!` - Routine per-request event
pub struct TrackingStarted<'a> {
    pub stage: &'a str,
    pub request_id: &'a str,
}

impl Display for TrackingStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stage '{}' tracking new request '{}'", self.stage, self.request_id)
    }
}

impl StructuredLog for TrackingStarted<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, request_id = self.request_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "tracking_started",
            span_name = name,
            stage = self.stage,
            request_id = self.request_id,
        )
    }
}

/// Snapshot of a request's counters after a tuple was applied.
///
/// # Log Level
/// `trace!` - High volume
pub struct TrackingProgress<'a> {
    pub stage: &'a str,
    pub request_id: &'a str,
    pub items_received: u64,
    pub items_expected: u64,
    pub count_messages_received: u64,
}

impl Display for TrackingProgress<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' request '{}': {}/{} items, {} count message(s)",
            self.stage,
            self.request_id,
            self.items_received,
            self.items_expected,
            self.count_messages_received
        )
    }
}

impl StructuredLog for TrackingProgress<'_> {
    fn log(&self) {
        tracing::trace!(
            stage = self.stage,
            request_id = self.request_id,
            items_received = self.items_received,
            items_expected = self.items_expected,
            count_messages_received = self.count_messages_received,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "tracking_progress",
            span_name = name,
            stage = self.stage,
            request_id = self.request_id,
        )
    }
}

/// Stage closed a request and emitted its one aggregate message.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StageCompleted<'a> {
    pub stage: &'a str,
    pub request_id: &'a str,
    pub emitted_count: u64,
}

impl Display for StageCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' got all for request '{}', emitting count {}",
            self.stage, self.request_id, self.emitted_count
        )
    }
}

impl StructuredLog for StageCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            request_id = self.request_id,
            emitted_count = self.emitted_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_completed",
            span_name = name,
            stage = self.stage,
            request_id = self.request_id,
            emitted_count = self.emitted_count,
        )
    }
}

/// A tuple arrived for a request this stage already sealed.
///
/// # Log Level
/// `debug!` - Expected under at-least-once delivery
pub struct LateMessageDiscarded<'a> {
    pub stage: &'a str,
    pub request_id: &'a str,
    pub stream: &'a str,
}

impl Display for LateMessageDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' discarded late {} tuple for completed request '{}'",
            self.stage, self.stream, self.request_id
        )
    }
}

impl StructuredLog for LateMessageDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            request_id = self.request_id,
            stream = self.stream,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "late_message_discarded",
            span_name = name,
            stage = self.stage,
            request_id = self.request_id,
        )
    }
}

/// The mapper hit its per-request cap; later derived items are dropped.
///
/// # Log Level
/// `info!` - Completeness traded for bounded fan-out
pub struct ItemCapReached<'a> {
    pub stage: &'a str,
    pub request_id: &'a str,
    pub cap: u64,
}

impl Display for ItemCapReached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' reached cap of {} items for request '{}'",
            self.stage, self.cap, self.request_id
        )
    }
}

impl StructuredLog for ItemCapReached<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            request_id = self.request_id,
            cap = self.cap,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "item_cap_reached",
            span_name = name,
            stage = self.stage,
            request_id = self.request_id,
            cap = self.cap,
        )
    }
}
