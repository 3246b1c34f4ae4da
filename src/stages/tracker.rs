// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::ReleaseMode;
use crate::errors::{ProtocolError, StageError};
use crate::observability::messages::request::{RequestCompleted, RequestQueued, RequestReleased};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Emitter, Envelope, RequestId, Stream};
use crate::stages::unexpected_stream;
use crate::traits::Stage;

/// One correlated request, as seen by whoever runs the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub request_id: RequestId,
    pub result: String,
    pub latency: Duration,
}

/// Closes the loop: admits requests into the expansion chain and correlates
/// terminal results back to them.
///
/// In [`ReleaseMode::Serialized`] at most one request is in flight; the rest
/// wait in a FIFO queue and the next one is released when the current one
/// completes. Latency is measured from release, not from arrival.
pub struct RequestTracker {
    name: String,
    mode: ReleaseMode,
    expected_total: Option<usize>,
    reports: Option<UnboundedSender<CompletionReport>>,
    in_flight: HashMap<RequestId, Instant>,
    queue: VecDeque<(RequestId, String)>,
    queued: HashSet<RequestId>,
    received: usize,
}

impl RequestTracker {
    /// `expected_total` is how many requests the source will send; serialized
    /// mode uses it to tell a drained run from a lost request.
    pub fn new(
        name: impl Into<String>,
        mode: ReleaseMode,
        expected_total: Option<usize>,
        reports: Option<UnboundedSender<CompletionReport>>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            expected_total,
            reports,
            in_flight: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            received: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn release(&mut self, request_id: RequestId, root: String, out: &mut Emitter) {
        self.in_flight.insert(request_id.clone(), Instant::now());
        RequestReleased {
            request_id: request_id.as_str(),
            root: &root,
            in_flight: self.in_flight.len(),
        }
        .log();
        out.emit_data(request_id, root);
    }

    fn on_request(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        let request_id = envelope.tuple.request_id().clone();
        if self.in_flight.contains_key(&request_id) || self.queued.contains(&request_id) {
            return Err(ProtocolError::DuplicateRequest(request_id).into());
        }
        self.received += 1;
        let root = envelope.tuple.value().to_string();

        match self.mode {
            ReleaseMode::Serialized if !self.in_flight.is_empty() || !self.queue.is_empty() => {
                self.queued.insert(request_id.clone());
                self.queue.push_back((request_id.clone(), root));
                RequestQueued {
                    request_id: request_id.as_str(),
                    queue_depth: self.queue.len(),
                }
                .log();
            }
            _ => self.release(request_id, root, out),
        }
        Ok(())
    }

    fn on_terminal(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        let request_id = envelope.tuple.request_id().clone();
        let Some(released_at) = self.in_flight.remove(&request_id) else {
            return Err(ProtocolError::OrphanedCompletion(request_id).into());
        };
        let latency = released_at.elapsed();
        let result = envelope.tuple.value().to_string();

        RequestCompleted {
            request_id: request_id.as_str(),
            result: &result,
            latency,
        }
        .log();

        if let Some(reports) = &self.reports {
            // The receiver goes away once the run has collected what it needs.
            let _ = reports.send(CompletionReport {
                request_id: request_id.clone(),
                result,
                latency,
            });
        }

        if self.mode == ReleaseMode::Serialized {
            match self.queue.pop_front() {
                Some((next_id, root)) => {
                    self.queued.remove(&next_id);
                    self.release(next_id, root, out);
                }
                None => {
                    let missing = self
                        .expected_total
                        .map_or(0, |total| total.saturating_sub(self.received));
                    if missing > 0 {
                        return Err(ProtocolError::EmptyReleaseQueue(request_id, missing).into());
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for RequestTracker {
    async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        match envelope.stream {
            Stream::Requests => self.on_request(envelope, out),
            Stream::Terminal => self.on_terminal(envelope, out),
            _ => Err(unexpected_stream(&self.name, &envelope).into()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
