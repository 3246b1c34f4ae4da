// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::router::{stream_label, Router};
use crate::errors::StageError;
use crate::observability::messages::engine::{EnvelopeReceived, WorkerCrashed, WorkerRestarted};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Emitter, Envelope};
use crate::traits::{Stage, StageFactory};

/// One instance of a component: owns a stage and drains its inbox.
///
/// A fatal `StageError` or a panic inside `handle` discards the stage, and
/// with it every request state the instance held, then carries on with a
/// fresh stage from the factory.
pub(crate) struct Worker {
    pub component: String,
    pub instance: usize,
    pub factory: StageFactory,
    pub inbox: UnboundedReceiver<Envelope>,
    pub router: Arc<Router>,
    pub restarts: Arc<AtomicUsize>,
    pub cancel: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(mut self) {
        let mut stage: Box<dyn Stage> = (self.factory)();
        tracing::debug!(component = %self.component, instance = self.instance, "worker started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = self.inbox.recv() => {
                    let Some(envelope) = received else { break };
                    let mut out = Emitter::new();
                    let message = EnvelopeReceived {
                        component: &self.component,
                        instance: self.instance,
                        source: &envelope.source,
                        stream: stream_label(envelope.stream),
                    };
                    message.log();
                    let span = message.span("handle");

                    let outcome = AssertUnwindSafe(stage.handle(envelope, &mut out))
                        .catch_unwind()
                        .instrument(span)
                        .await
                        .unwrap_or_else(|panic| Err(StageError::Panicked(panic_message(panic))));

                    match outcome {
                        Ok(()) => {
                            for (stream, tuple) in out.drain() {
                                self.router
                                    .dispatch(Envelope::new(self.component.as_str(), stream, tuple));
                            }
                        }
                        Err(error) => {
                            WorkerCrashed {
                                component: &self.component,
                                instance: self.instance,
                                error: &error,
                            }
                            .log();
                            stage = (self.factory)();
                            let restarts = self.restarts.fetch_add(1, Ordering::SeqCst) + 1;
                            WorkerRestarted {
                                component: &self.component,
                                instance: self.instance,
                                restarts,
                            }
                            .log();
                        }
                    }
                }
            }
        }

        tracing::debug!(component = %self.component, instance = self.instance, "worker stopped");
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
