// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::{ProtocolError, StageError};
use crate::observability::messages::stage::{
    LateMessageDiscarded, StageCompleted, TrackingProgress, TrackingStarted,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Emitter, Envelope, RequestId, Stream};
use crate::stages::unexpected_stream;
use crate::tracking::{SlotStatus, StageTrackingState, TrackingTable};
use crate::traits::Stage;

/// Barrier between the expansion chain and the rest of the pipeline.
///
/// Receives the count and data streams of every chain link, forwards each
/// vertex the first time it is seen for a request, and once the request is
/// complete emits the number of unique vertices as the authoritative count for
/// the next stage.
///
/// Count accounting across a chain of depth `D`: a request starts out waiting
/// for one count tuple (the root expansion). A count `n` from any link adds
/// `n` to the expected vertices. A count from a link other than the terminal
/// one also adds `n` to the expected count tuples, because the next link
/// expands each of those `n` vertices and reports exactly one count for each.
pub struct Deduplicator {
    name: String,
    terminal_producer: String,
    table: TrackingTable<StageTrackingState>,
}

impl Deduplicator {
    /// `terminal_producer` is the component name of the last chain link.
    pub fn new(name: impl Into<String>, terminal_producer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminal_producer: terminal_producer.into(),
            table: TrackingTable::new(),
        }
    }

    pub fn table(&self) -> &TrackingTable<StageTrackingState> {
        &self.table
    }

    /// Seal and emit if the barrier closed. Called on both paths, since either
    /// the last count or the last vertex may be what closes it.
    fn check_done(&mut self, request_id: &RequestId, out: &mut Emitter) {
        let done = self
            .table
            .get(request_id)
            .map_or(false, StageTrackingState::barrier_done);
        if !done {
            return;
        }
        if let Some(state) = self.table.seal(request_id) {
            let unique = state.seen.len() as u64;
            StageCompleted {
                stage: &self.name,
                request_id: request_id.as_str(),
                emitted_count: unique,
            }
            .log();
            out.emit_count(request_id.clone(), unique);
        }
    }
}

#[async_trait]
impl Stage for Deduplicator {
    async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        let stream = envelope.stream;
        if stream != Stream::Count && stream != Stream::Data {
            return Err(unexpected_stream(&self.name, &envelope).into());
        }
        let count = match stream {
            Stream::Count => Some(envelope.tuple.count_value()?),
            _ => None,
        };
        let request_id = envelope.tuple.request_id().clone();

        if self.table.status(&request_id) == SlotStatus::Absent {
            TrackingStarted {
                stage: &self.name,
                request_id: request_id.as_str(),
            }
            .log();
        }
        let Some(state) = self.table.track_with(&request_id, StageTrackingState::barrier) else {
            LateMessageDiscarded {
                stage: &self.name,
                request_id: request_id.as_str(),
                stream: if count.is_some() { "count" } else { "data" },
            }
            .log();
            return Ok(());
        };

        match count {
            Some(count) => {
                let overflow = || ProtocolError::MalformedCount {
                    request_id: request_id.clone(),
                    value: count.to_string(),
                };
                let items_expected = state.items_expected.checked_add(count).ok_or_else(overflow)?;
                let count_messages_expected = if envelope.source != self.terminal_producer {
                    state
                        .count_messages_expected
                        .checked_add(count)
                        .ok_or_else(overflow)?
                } else {
                    state.count_messages_expected
                };
                state.count_messages_received += 1;
                state.items_expected = items_expected;
                state.count_messages_expected = count_messages_expected;
            }
            None => {
                state.items_received += 1;
                let vertex = envelope.tuple.value();
                if state.seen.insert(vertex.to_string()) {
                    out.emit_data(request_id.clone(), vertex);
                }
            }
        }

        TrackingProgress {
            stage: &self.name,
            request_id: request_id.as_str(),
            items_received: state.items_received,
            items_expected: state.items_expected,
            count_messages_received: state.count_messages_received,
        }
        .log();

        self.check_done(&request_id, out);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
