// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::StageError;
use crate::observability::messages::{backend::RecoverableBackendFailure, StructuredLog};
use crate::protocol::{Emitter, Envelope, Stream};
use crate::stages::{sorted, unexpected_stream};
use crate::traits::{ComputeBackend, Stage};

/// One link of the neighbor-expansion chain.
///
/// For every `(request, vertex)` it emits one count tuple followed by one data
/// tuple per neighbor. Keeps no state.
pub struct Expander {
    name: String,
    backend: Arc<dyn ComputeBackend>,
}

impl Expander {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }
}

#[async_trait]
impl Stage for Expander {
    async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
        if envelope.stream != Stream::Data {
            return Err(unexpected_stream(&self.name, &envelope).into());
        }
        let request_id = envelope.tuple.request_id().clone();
        let vertex = envelope.tuple.value();

        match self.backend.children(vertex).await {
            Ok(children) => {
                out.emit_count(request_id.clone(), children.len() as u64);
                for child in sorted(children) {
                    out.emit_data(request_id.clone(), child);
                }
            }
            Err(error) if error.is_recoverable() => {
                RecoverableBackendFailure {
                    stage: &self.name,
                    operation: "children",
                    key: vertex,
                    error: &error,
                }
                .log();
                // The branch is lost, but downstream count accounting still
                // expects one count tuple per expanded vertex.
                out.emit_count(request_id, 0);
            }
            Err(error) => return Err(error.into()),
        }
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

    fn vertex(request: &str, v: &str) -> Envelope {
        Envelope::new("tracker", Stream::Data, Tuple::data(request.into(), v))
    }

    #[tokio::test]
    async fn test_emits_count_then_each_child() {
        let backend = ScriptedBackend::new().with_children("root", &["b", "a", "c"]);
        let mut expander = Expander::new("expand0", Arc::new(backend));
        let mut out = Emitter::new();

        expander.handle(vertex("r1", "root"), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Count), vec!["3"]);
        assert_eq!(out.values_on(Stream::Data), vec!["a", "b", "c"]);
        assert!(out.outbound().iter().all(|(_, t)| t.request_id().as_str() == "r1"));
    }

    #[tokio::test]
    async fn test_recoverable_failure_closes_branch_with_zero_count() {
        let backend = ScriptedBackend::new()
            .failing_children("root", BackendError::TransientStoreMiss("root".into()));
        let mut expander = Expander::new("expand0", Arc::new(backend));
        let mut out = Emitter::new();

        expander.handle(vertex("r1", "root"), &mut out).await.unwrap();

        assert_eq!(out.values_on(Stream::Count), vec!["0"]);
        assert!(out.values_on(Stream::Data).is_empty());
    }

    #[tokio::test]
    async fn test_unrecoverable_failure_is_fatal() {
        let backend = ScriptedBackend::new()
            .failing_children("root", BackendError::Unrecoverable("connection reset".into()));
        let mut expander = Expander::new("expand0", Arc::new(backend));
        let mut out = Emitter::new();

        let result = expander.handle(vertex("r1", "root"), &mut out).await;

        assert!(matches!(
            result,
            Err(StageError::Backend(BackendError::Unrecoverable(_)))
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_count_stream() {
        let mut expander = Expander::new("expand1", Arc::new(ScriptedBackend::new()));
        let mut out = Emitter::new();
        let envelope = Envelope::new("expand0", Stream::Count, Tuple::count("r1".into(), 2));

        assert!(matches!(
            expander.handle(envelope, &mut out).await,
            Err(StageError::Protocol(_))
        ));
    }
}
