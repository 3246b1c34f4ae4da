// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{ProtocolError, StageError};
use crate::observability::messages::backend::RecoverableBackendFailure;
use crate::observability::messages::stage::{
    ItemCapReached, LateMessageDiscarded, StageCompleted, TrackingProgress, TrackingStarted,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Emitter, Envelope, RequestId, Stream};
use crate::stages::{sorted, unexpected_stream};
use crate::tracking::{SlotStatus, StageTrackingState, TrackingTable};
use crate::traits::{ComputeBackend, Stage};

/// Maps each unique vertex to its images, with a hard cap on how many images
/// a single request may forward.
///
/// The cap is the pipeline's only back-pressure control: once `max_items`
/// images went out for a request, later vertices are still counted but no
/// longer looked up, and the request closes as soon as the upstream count has
/// arrived. The count it emits downstream is the number of images actually
/// forwarded.
pub struct LimitedMapper {
    name: String,
    max_items: u64,
    backend: Arc<dyn ComputeBackend>,
    table: TrackingTable<StageTrackingState>,
}

impl LimitedMapper {
    pub fn new(name: impl Into<String>, max_items: u64, backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            name: name.into(),
            max_items,
            backend,
            table: TrackingTable::new(),
        }
    }

    pub fn table(&self) -> &TrackingTable<StageTrackingState> {
        &self.table
    }

    fn check_done(&mut self, request_id: &RequestId, out: &mut Emitter) {
        let max_items = self.max_items;
        let done = self
            .table
            .get(request_id)
            .map_or(false, |state| state.bounded_done(max_items));
        if !done {
            return;
        }
        if let Some(state) = self.table.seal(request_id) {
            StageCompleted {
                stage: &self.name,
                request_id: request_id.as_str(),
                emitted_count: state.items_sent,
            }
            .log();
            out.emit_count(request_id.clone(), state.items_sent);
        }
    }
}

#[async_trait]
impl Stage for LimitedMapper {
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
        let Some(state) = self.table.track(&request_id) else {
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
                state.count_messages_received += 1;
                if state.count_messages_received > 1 {
                    return Err(ProtocolError::DuplicateCount {
                        stage: self.name.clone(),
                        request_id,
                    }
                    .into());
                }
                state.items_expected = state.items_expected.checked_add(count).ok_or_else(|| {
                    ProtocolError::MalformedCount {
                        request_id: request_id.clone(),
                        value: count.to_string(),
                    }
                })?;
            }
            None => {
                state.items_received += 1;
                let vertex = envelope.tuple.value();
                if state.items_sent < self.max_items {
                    match self.backend.images_of(vertex).await {
                        Ok(images) => {
                            for image in sorted(images) {
                                if state.items_sent >= self.max_items {
                                    break;
                                }
                                if state.seen.insert(image.clone()) {
                                    out.emit_data(request_id.clone(), image);
                                    state.items_sent += 1;
                                }
                            }
                            if state.items_sent >= self.max_items {
                                ItemCapReached {
                                    stage: &self.name,
                                    request_id: request_id.as_str(),
                                    cap: self.max_items,
                                }
                                .log();
                            }
                        }
                        Err(error) if error.is_recoverable() => {
                            RecoverableBackendFailure {
                                stage: &self.name,
                                operation: "images_of",
                                key: vertex,
                                error: &error,
                            }
                            .log();
                        }
                        Err(error) => return Err(error.into()),
                    }
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
