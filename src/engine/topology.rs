// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::router::{Grouping, Router};
use crate::engine::worker::Worker;
use crate::observability::messages::engine::TopologyStarted;
use crate::observability::messages::StructuredLog;
use crate::protocol::{Envelope, Stream};
use crate::traits::StageFactory;

/// A component to be run as `parallelism` worker instances.
pub struct ComponentSpec {
    name: String,
    parallelism: usize,
    factory: StageFactory,
    subscriptions: Vec<(String, Stream, Grouping)>,
}

impl ComponentSpec {
    /// Receive `stream` tuples emitted by `source`.
    pub fn subscribe(&mut self, source: &str, stream: Stream, grouping: Grouping) -> &mut Self {
        self.subscriptions.push((source.to_string(), stream, grouping));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Declares components and their subscriptions, then spawns the workers.
///
/// # Example
/// ```rust
/// use pulse::engine::{Grouping, TopologyBuilder};
/// use pulse::protocol::{Envelope, Stream, Tuple};
/// use pulse::stages::Enricher;
/// use pulse::backends::SyntheticBackend;
/// use pulse::traits::{ComputeBackend, Stage, StageFactory};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let backend: Arc<dyn ComputeBackend> = Arc::new(SyntheticBackend::new(2, 1));
/// let factory: StageFactory =
///     Arc::new(move || Box::new(Enricher::new("enricher", backend.clone())) as Box<dyn Stage>);
///
/// let mut builder = TopologyBuilder::new();
/// builder
///     .set_stage("enricher", 2, factory)
///     .subscribe("mapper", Stream::Data, Grouping::Shuffle);
/// let topology = builder.start();
///
/// let delivered = topology.inject(Envelope::new("mapper", Stream::Data, Tuple::data("r1".into(), "img")));
/// assert_eq!(delivered, 1);
/// topology.shutdown().await;
/// # }
/// ```
#[derive(Default)]
pub struct TopologyBuilder {
    components: Vec<ComponentSpec>,
    preload: Vec<Envelope>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. A parallelism of zero is raised to one.
    pub fn set_stage(
        &mut self,
        name: &str,
        parallelism: usize,
        factory: StageFactory,
    ) -> &mut ComponentSpec {
        self.components.retain(|c| c.name != name);
        self.components.push(ComponentSpec {
            name: name.to_string(),
            parallelism: parallelism.max(1),
            factory,
            subscriptions: Vec::new(),
        });
        let last = self.components.len() - 1;
        &mut self.components[last]
    }

    /// Route an envelope before any worker runs, so it is first in line.
    pub fn preload(&mut self, envelope: Envelope) {
        self.preload.push(envelope);
    }

    pub fn start(self) -> Topology {
        let mut inboxes = HashMap::new();
        let mut receivers = Vec::new();
        for component in &self.components {
            let (senders, rx): (Vec<_>, Vec<_>) = (0..component.parallelism)
                .map(|_| mpsc::unbounded_channel::<Envelope>())
                .unzip();
            inboxes.insert(component.name.clone(), senders);
            receivers.push(rx);
        }

        let mut router = Router::new();
        for component in &self.components {
            for (source, stream, grouping) in &component.subscriptions {
                let targets = inboxes.get(&component.name).cloned().unwrap_or_default();
                router.add_route(source, *stream, &component.name, *grouping, targets);
            }
        }
        let router = Arc::new(router);

        for envelope in self.preload {
            router.dispatch(envelope);
        }

        let cancel = CancellationToken::new();
        let restarts = Arc::new(AtomicUsize::new(0));
        let component_count = self.components.len();
        let mut handles = Vec::new();
        for (component, receivers) in self.components.into_iter().zip(receivers) {
            for (instance, inbox) in receivers.into_iter().enumerate() {
                let worker = Worker {
                    component: component.name.clone(),
                    instance,
                    factory: component.factory.clone(),
                    inbox,
                    router: router.clone(),
                    restarts: restarts.clone(),
                    cancel: cancel.clone(),
                };
                handles.push(tokio::spawn(worker.run()));
            }
        }

        TopologyStarted {
            component_count,
            worker_count: handles.len(),
        }
        .log();

        Topology {
            router,
            cancel,
            restarts,
            handles,
        }
    }
}

/// Cheap handle for feeding tuples into a running topology.
#[derive(Clone)]
pub struct Injector {
    router: Arc<Router>,
}

impl Injector {
    pub fn inject(&self, envelope: Envelope) -> usize {
        self.router.dispatch(envelope)
    }
}

/// Running workers. Dropping it cancels them; `shutdown` also waits.
pub struct Topology {
    router: Arc<Router>,
    cancel: CancellationToken,
    restarts: Arc<AtomicUsize>,
    handles: Vec<JoinHandle<()>>,
}

impl Topology {
    pub fn inject(&self, envelope: Envelope) -> usize {
        self.router.dispatch(envelope)
    }

    pub fn injector(&self) -> Injector {
        Injector {
            router: self.router.clone(),
        }
    }

    /// Worker restarts so far, across all components.
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task did not shut down cleanly");
            }
        }
    }
}

impl Drop for Topology {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ProtocolError, StageError};
    use crate::protocol::{Emitter, Tuple};
    use crate::traits::Stage;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Forwards data unchanged; fails on the item "boom" and panics on "panic".
    struct Relay;

    #[async_trait]
    impl Stage for Relay {
        async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError> {
            if envelope.tuple.value() == "boom" {
                return Err(ProtocolError::OrphanedCompletion(envelope.request_id().clone()).into());
            }
            if envelope.tuple.value() == "panic" {
                panic!("relay cannot handle {}", envelope.request_id());
            }
            out.emit(Stream::Terminal, envelope.tuple);
            Ok(())
        }

        fn name(&self) -> &str {
            "relay"
        }
    }

    /// Reports every terminal tuple it sees.
    struct Sink(mpsc::UnboundedSender<Tuple>);

    #[async_trait]
    impl Stage for Sink {
        async fn handle(&mut self, envelope: Envelope, _out: &mut Emitter) -> Result<(), StageError> {
            let _ = self.0.send(envelope.tuple);
            Ok(())
        }

        fn name(&self) -> &str {
            "sink"
        }
    }

    fn relay_into_sink(parallelism: usize) -> (Topology, mpsc::UnboundedReceiver<Tuple>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut builder = TopologyBuilder::new();
        builder
            .set_stage("relay", parallelism, Arc::new(|| Box::new(Relay) as Box<dyn Stage>))
            .subscribe("input", Stream::Data, Grouping::ByRequest);
        builder
            .set_stage("sink", 1, Arc::new(move || Box::new(Sink(tx.clone())) as Box<dyn Stage>))
            .subscribe("relay", Stream::Terminal, Grouping::Shuffle);
        (builder.start(), rx)
    }

    fn input(request: &str, item: &str) -> Envelope {
        Envelope::new("input", Stream::Data, Tuple::data(request.into(), item))
    }

    #[tokio::test]
    async fn test_tuples_flow_between_components() {
        let (topology, mut rx) = relay_into_sink(3);
        assert_eq!(topology.worker_count(), 4);

        topology.inject(input("r1", "a"));
        topology.inject(input("r2", "b"));

        let mut seen = vec![
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap(),
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap(),
        ];
        seen.sort_by(|a, b| a.value().cmp(b.value()));
        assert_eq!(seen[0], Tuple::data("r1".into(), "a"));
        assert_eq!(seen[1], Tuple::data("r2".into(), "b"));
        topology.shutdown().await;
    }

    #[tokio::test]
    async fn test_crashed_worker_is_restarted_and_keeps_serving() {
        let (topology, mut rx) = relay_into_sink(1);

        topology.inject(input("r1", "boom"));
        topology.inject(input("r2", "ok"));

        let tuple = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tuple.value(), "ok");
        assert_eq!(topology.restarts(), 1);
        topology.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_worker_is_restarted_and_keeps_serving() {
        let (topology, mut rx) = relay_into_sink(1);

        topology.inject(input("r1", "panic"));
        topology.inject(input("r2", "ok"));

        let tuple = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tuple.value(), "ok");
        assert_eq!(topology.restarts(), 1);

        topology.inject(input("r3", "later"));
        let tuple = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tuple.value(), "later");
        topology.shutdown().await;
    }

    #[tokio::test]
    async fn test_preloaded_tuples_are_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = TopologyBuilder::new();
        builder
            .set_stage("sink", 1, Arc::new(move || Box::new(Sink(tx.clone())) as Box<dyn Stage>))
            .subscribe("input", Stream::Data, Grouping::Shuffle);
        builder.preload(input("r1", "early"));
        let topology = builder.start();

        let tuple = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tuple.value(), "early");
        topology.shutdown().await;
    }
}
