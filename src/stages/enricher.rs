// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::StageError;
use crate::observability::messages::{backend::RecoverableBackendFailure, StructuredLog};
use crate::protocol::{Emitter, Envelope, Stream};
use crate::stages::unexpected_stream;
use crate::traits::{ComputeBackend, Stage};

/// Runs feature extraction on each image and forwards it.
///
/// Forwards exactly one tuple per input, even when extraction fails
/// recoverably, because the aggregator closes on a count of items.
pub struct Enricher {
    name: String,
    backend: Arc<dyn ComputeBackend>,
}

impl Enricher {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }
}

#[async_trait]
impl Stage for Enricher {
    async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        if envelope.stream != Stream::Data {
            return Err(unexpected_stream(&self.name, &envelope).into());
        }
        let image = envelope.tuple.value();

        match self.backend.extract_features(image).await {
            Ok(features) => {
                tracing::trace!(stage = %self.name, image, features, "extracted features");
            }
            Err(error) if error.is_recoverable() => {
                RecoverableBackendFailure {
                    stage: &self.name,
                    operation: "extract_features",
                    key: image,
                    error: &error,
                }
                .log();
            }
            Err(error) => return Err(error.into()),
        }

        out.emit(Stream::Data, envelope.tuple);
        Ok(())
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
        Envelope::new("mapper", Stream::Data, Tuple::data(request.into(), img))
    }

    #[tokio::test]
    async fn test_forwards_enriched_image() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut stage = Enricher::new("enricher", backend.clone());
        let mut out = Emitter::new();

        stage.handle(image("R1", "img-1"), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Data), vec!["img-1"]);
        assert_eq!(backend.extract_calls(), 1);
    }

    #[tokio::test]
    async fn test_forwards_image_unchanged_when_extraction_fails() {
        let backend = ScriptedBackend::new()
            .failing_features("img-1", BackendError::ComputeFailure("out of GPU memory".into()));
        let mut stage = Enricher::new("enricher", Arc::new(backend));
        let mut out = Emitter::new();

        stage.handle(image("R1", "img-1"), &mut out).await.unwrap();

        assert_eq!(out.outbound(), &[(Stream::Data, Tuple::data("R1".into(), "img-1"))]);
    }

    #[tokio::test]
    async fn test_unrecoverable_extraction_failure_is_fatal() {
        let backend = ScriptedBackend::new()
            .failing_features("img-1", BackendError::Unrecoverable("driver lost".into()));
        let mut stage = Enricher::new("enricher", Arc::new(backend));
        let mut out = Emitter::new();

        assert!(stage.handle(image("R1", "img-1"), &mut out).await.is_err());
        assert!(out.is_empty());
    }
}
