// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the delivery substrate and worker supervision.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Topology wired and workers spawned.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TopologyStarted {
    pub component_count: usize,
    pub worker_count: usize,
}

impl Display for TopologyStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Topology started: {} components, {} worker instances",
            self.component_count, self.worker_count
        )
    }
}

impl StructuredLog for TopologyStarted {
    fn log(&self) {
        tracing::info!(
            component_count = self.component_count,
            worker_count = self.worker_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "topology",
            span_name = name,
            component_count = self.component_count,
            worker_count = self.worker_count,
        )
    }
}

/// A worker picked an envelope off its inbox. Its span wraps `Stage::handle`.
///
/// # Log Level
/// `trace!` - Per-tuple detail
pub struct EnvelopeReceived<'a> {
    pub component: &'a str,
    pub instance: usize,
    pub source: &'a str,
    pub stream: &'a str,
}

impl Display for EnvelopeReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {}[{}] received {} from '{}'",
            self.component, self.instance, self.stream, self.source
        )
    }
}

impl StructuredLog for EnvelopeReceived<'_> {
    fn log(&self) {
        tracing::trace!(
            component = self.component,
            instance = self.instance,
            source = self.source,
            stream = self.stream,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_handle",
            span_name = name,
            component = self.component,
            instance = self.instance,
            stream = self.stream,
        )
    }
}

/// A stage returned a fatal error; its instance state is gone.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerCrashed<'a> {
    pub component: &'a str,
    pub instance: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for WorkerCrashed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {}[{}] crashed: {}",
            self.component, self.instance, self.error
        )
    }
}

impl StructuredLog for WorkerCrashed<'_> {
    fn log(&self) {
        tracing::error!(
            component = self.component,
            instance = self.instance,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "worker_crashed",
            span_name = name,
            component = self.component,
            instance = self.instance,
        )
    }
}

/// Supervisor replaced a crashed stage with a fresh one.
///
/// # Log Level
/// `warn!` - Degraded behavior
pub struct WorkerRestarted<'a> {
    pub component: &'a str,
    pub instance: usize,
    pub restarts: usize,
}

impl Display for WorkerRestarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {}[{}] restarted (restart #{})",
            self.component, self.instance, self.restarts
        )
    }
}

impl StructuredLog for WorkerRestarted<'_> {
    fn log(&self) {
        tracing::warn!(
            component = self.component,
            instance = self.instance,
            restarts = self.restarts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "worker_restarted",
            span_name = name,
            component = self.component,
            instance = self.instance,
        )
    }
}

/// No subscriber exists for an emitted stream; the tuple is dropped.
///
/// # Log Level
/// `trace!` - Expected for sink streams
pub struct UnroutedTuple<'a> {
    pub source: &'a str,
    pub stream: &'a str,
}

impl Display for UnroutedTuple<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "No subscribers for {} from '{}'", self.stream, self.source)
    }
}

impl StructuredLog for UnroutedTuple<'_> {
    fn log(&self) {
        tracing::trace!(source = self.source, stream = self.stream, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("unrouted_tuple", span_name = name, source = self.source)
    }
}

/// Run finished, either because every request completed or the timeout hit.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunFinished {
    pub completed: usize,
    pub missing: usize,
    pub restarts: usize,
    pub elapsed: Duration,
}

impl Display for RunFinished {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run finished in {:?}: {} completed, {} missing, {} worker restart(s)",
            self.elapsed, self.completed, self.missing, self.restarts
        )
    }
}

impl StructuredLog for RunFinished {
    fn log(&self) {
        tracing::info!(
            completed = self.completed,
            missing = self.missing,
            restarts = self.restarts,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_finished",
            span_name = name,
            completed = self.completed,
            missing = self.missing,
        )
    }
}
