// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedSender;

use crate::engine::partition::partition_for;
use crate::observability::messages::engine::UnroutedTuple;
use crate::observability::messages::StructuredLog;
use crate::protocol::{Envelope, Stream};

/// How a subscription picks the target instance for each tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Round robin. For stateless targets.
    Shuffle,
    /// Hash of the request id, so one instance sees all of a request.
    ByRequest,
    /// Hash of the item field. Spreads one request's fan-out across instances.
    ByItem,
}

#[derive(Debug)]
struct Route {
    target: String,
    grouping: Grouping,
    inboxes: Vec<UnboundedSender<Envelope>>,
    next: AtomicUsize,
}

impl Route {
    fn pick(&self, envelope: &Envelope) -> usize {
        let n = self.inboxes.len();
        match self.grouping {
            Grouping::Shuffle => self.next.fetch_add(1, Ordering::Relaxed) % n,
            Grouping::ByRequest => partition_for(envelope.request_id().as_str(), n),
            Grouping::ByItem => partition_for(envelope.tuple.value(), n),
        }
    }
}

/// Subscription table: `(source component, stream)` to target inboxes.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<(String, Stream), Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(
        &mut self,
        source: &str,
        stream: Stream,
        target: &str,
        grouping: Grouping,
        inboxes: Vec<UnboundedSender<Envelope>>,
    ) {
        if inboxes.is_empty() {
            return;
        }
        self.routes
            .entry((source.to_string(), stream))
            .or_default()
            .push(Route {
                target: target.to_string(),
                grouping,
                inboxes,
                next: AtomicUsize::new(0),
            });
    }

    /// Deliver a copy of the envelope to every subscriber of its stream.
    /// Returns the number of deliveries.
    pub fn dispatch(&self, envelope: Envelope) -> usize {
        let Some(routes) = self.routes.get(&(envelope.source.clone(), envelope.stream)) else {
            UnroutedTuple {
                source: &envelope.source,
                stream: stream_label(envelope.stream),
            }
            .log();
            return 0;
        };

        let mut delivered = 0;
        for route in routes {
            let instance = route.pick(&envelope);
            match route.inboxes[instance].send(envelope.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::trace!(
                        target_component = %route.target,
                        instance,
                        "inbox closed, dropping tuple"
                    );
                }
            }
        }
        delivered
    }
}

pub(crate) fn stream_label(stream: Stream) -> &'static str {
    match stream {
        Stream::Requests => "requests",
        Stream::Data => "data",
        Stream::Count => "count",
        Stream::Terminal => "terminal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Tuple;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn inboxes(n: usize) -> (Vec<UnboundedSender<Envelope>>, Vec<UnboundedReceiver<Envelope>>) {
        (0..n).map(|_| mpsc::unbounded_channel()).unzip()
    }

    fn drain(rx: &mut UnboundedReceiver<Envelope>) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(envelope);
        }
        out
    }

    #[test]
    fn test_by_request_keeps_a_request_on_one_instance() {
        let (tx, mut rx) = inboxes(4);
        let mut router = Router::new();
        router.add_route("expand0", Stream::Data, "deduplicator", Grouping::ByRequest, tx);

        for item in ["a", "b", "c", "d", "e"] {
            router.dispatch(Envelope::new("expand0", Stream::Data, Tuple::data("R1".into(), item)));
        }

        let loads: Vec<usize> = rx.iter_mut().map(|r| drain(r).len()).collect();
        assert_eq!(loads.iter().sum::<usize>(), 5);
        assert_eq!(loads.iter().filter(|&&n| n > 0).count(), 1);
    }

    #[test]
    fn test_shuffle_round_robins() {
        let (tx, mut rx) = inboxes(2);
        let mut router = Router::new();
        router.add_route("mapper", Stream::Data, "enricher", Grouping::Shuffle, tx);

        for item in ["a", "b", "c", "d"] {
            router.dispatch(Envelope::new("mapper", Stream::Data, Tuple::data("R1".into(), item)));
        }

        assert_eq!(drain(&mut rx[0]).len(), 2);
        assert_eq!(drain(&mut rx[1]).len(), 2);
    }

    #[test]
    fn test_every_subscriber_gets_a_copy() {
        let (dedup_tx, mut dedup_rx) = inboxes(1);
        let (next_tx, mut next_rx) = inboxes(1);
        let mut router = Router::new();
        router.add_route("expand0", Stream::Data, "deduplicator", Grouping::ByRequest, dedup_tx);
        router.add_route("expand0", Stream::Data, "expand1", Grouping::ByItem, next_tx);

        let delivered =
            router.dispatch(Envelope::new("expand0", Stream::Data, Tuple::data("R1".into(), "v")));

        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut dedup_rx[0]).len(), 1);
        assert_eq!(drain(&mut next_rx[0]).len(), 1);
    }

    #[test]
    fn test_unsubscribed_stream_is_dropped() {
        let router = Router::new();
        let delivered =
            router.dispatch(Envelope::new("mapper", Stream::Terminal, Tuple::terminal("R1".into(), "m")));
        assert_eq!(delivered, 0);
    }
}
