// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{ProtocolError, StageError};
use crate::observability::messages::backend::PlaceholderResult;
use crate::observability::messages::stage::{
    LateMessageDiscarded, StageCompleted, TrackingProgress, TrackingStarted,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Emitter, Envelope, RequestId, Stream};
use crate::stages::unexpected_stream;
use crate::tracking::{SlotStatus, StageTrackingState, TrackingTable};
use crate::traits::{ComputeBackend, Stage};

/// Gathers every enriched image of a request and renders one montage.
///
/// Exactly one count tuple is valid per request. The image set is dropped as
/// soon as the terminal result goes out; only the tombstone remains.
pub struct Aggregator {
    name: String,
    backend: Arc<dyn ComputeBackend>,
    table: TrackingTable<StageTrackingState>,
}

impl Aggregator {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            table: TrackingTable::new(),
        }
    }

    pub fn table(&self) -> &TrackingTable<StageTrackingState> {
        &self.table
    }

    async fn finalize(&mut self, request_id: &RequestId, out: &mut Emitter) -> Result<(), StageError> {
        let done = self
            .table
            .get(request_id)
            .map_or(false, StageTrackingState::aggregate_done);
        if !done {
            return Ok(());
        }
        let Some(state) = self.table.seal(request_id) else {
            return Ok(());
        };

        let result = match self.backend.montage(&state.seen).await {
            Ok(montage) => montage,
            Err(error) if error.is_recoverable() => {
                // items_received > 0, so the set holds at least one image
                let placeholder = state.seen.iter().next().cloned().unwrap_or_default();
                PlaceholderResult {
                    request_id: request_id.as_str(),
                    placeholder: &placeholder,
                    error: &error,
                }
                .log();
                placeholder
            }
            Err(error) => return Err(error.into()),
        };

        StageCompleted {
            stage: &self.name,
            request_id: request_id.as_str(),
            emitted_count: state.seen.len() as u64,
        }
        .log();
        out.emit_terminal(request_id.clone(), result);
        Ok(())
    }
}

#[async_trait]
impl Stage for Aggregator {
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
                if state.count_messages_received > 0 {
                    return Err(ProtocolError::DuplicateCount {
                        stage: self.name.clone(),
                        request_id,
                    }
                    .into());
                }
                state.count_messages_received = 1;
                state.items_expected = count;
            }
            None => {
                state.items_received += 1;
                state.seen.insert(envelope.tuple.value().to_string());
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

        self.finalize(&request_id, out).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::ScriptedBackend;
    use crate::errors::BackendError;
    use crate::protocol::Tuple;

    fn image(request: &str, img: &str) -> Envelope {
        Envelope::new("enricher", Stream::Data, Tuple::data(request.into(), img))
    }

    fn count(request: &str, n: u64) -> Envelope {
        Envelope::new("mapper", Stream::Count, Tuple::count(request.into(), n))
    }

    #[tokio::test]
    async fn test_montage_of_all_images_emitted_once() {
        let backend = Arc::new(ScriptedBackend::new().montage_returns("montage-1"));
        let mut stage = Aggregator::new("aggregator", backend.clone());
        let mut out = Emitter::new();

        stage.handle(image("R1", "b"), &mut out).await.unwrap();
        stage.handle(count("R1", 2), &mut out).await.unwrap();
        assert!(out.is_empty());
        stage.handle(image("R1", "a"), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Terminal), vec!["montage-1"]);
        assert_eq!(
            backend.montage_inputs(),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        assert_eq!(stage.table().status(&"R1".into()), SlotStatus::Emitted);
        assert!(stage.table().get(&"R1".into()).is_none());
    }

    #[tokio::test]
    async fn test_store_miss_substitutes_member_as_placeholder() {
        let backend = ScriptedBackend::new()
            .montage_fails(BackendError::TransientStoreMiss("X".into()));
        let mut stage = Aggregator::new("aggregator", Arc::new(backend));
        let mut out = Emitter::new();

        stage.handle(count("R1", 2), &mut out).await.unwrap();
        stage.handle(image("R1", "X"), &mut out).await.unwrap();
        assert!(out.is_empty());
        // The feature stage forwards one tuple per image, so a repeated image
        // still counts toward the expected total.
        stage.handle(image("R1", "X"), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Terminal), vec!["X"]);
    }

    #[tokio::test]
    async fn test_second_count_is_fatal() {
        let mut stage = Aggregator::new("aggregator", Arc::new(ScriptedBackend::new()));
        let mut out = Emitter::new();

        stage.handle(count("R1", 2), &mut out).await.unwrap();
        let result = stage.handle(count("R1", 2), &mut out).await;

        assert_eq!(
            result,
            Err(StageError::Protocol(ProtocolError::DuplicateCount {
                stage: "aggregator".to_string(),
                request_id: "R1".into(),
            }))
        );
    }

    #[tokio::test]
    async fn test_input_after_emission_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new().montage_returns("m"));
        let mut stage = Aggregator::new("aggregator", backend.clone());
        let mut out = Emitter::new();

        stage.handle(count("R1", 1), &mut out).await.unwrap();
        stage.handle(image("R1", "a"), &mut out).await.unwrap();
        stage.handle(image("R1", "b"), &mut out).await.unwrap();
        stage.handle(count("R1", 1), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Terminal), vec!["m"]);
        assert_eq!(backend.montage_inputs().len(), 1);
    }

    #[tokio::test]
    async fn test_unrecoverable_montage_failure_is_fatal() {
        let backend = ScriptedBackend::new()
            .montage_fails(BackendError::Unrecoverable("renderer crashed".into()));
        let mut stage = Aggregator::new("aggregator", Arc::new(backend));
        let mut out = Emitter::new();

        stage.handle(count("R1", 1), &mut out).await.unwrap();
        let result = stage.handle(image("R1", "a"), &mut out).await;

        assert!(matches!(result, Err(StageError::Backend(BackendError::Unrecoverable(_)))));
        assert!(out.is_empty());
    }
}
