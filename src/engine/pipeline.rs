// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::config::{Config, ReleaseMode};
use crate::engine::router::Grouping;
use crate::engine::topology::TopologyBuilder;
use crate::observability::messages::engine::RunFinished;
use crate::observability::messages::StructuredLog;
use crate::protocol::{Envelope, RequestId, Stream, Tuple};
use crate::stages::{
    Aggregator, CompletionReport, Deduplicator, Enricher, Expander, LimitedMapper, RequestSource,
    RequestTracker,
};
use crate::traits::{ComputeBackend, Stage};

pub const SOURCE: &str = "source";
pub const TRACKER: &str = "tracker";
pub const DEDUPLICATOR: &str = "deduplicator";
pub const MAPPER: &str = "mapper";
pub const ENRICHER: &str = "enricher";
pub const AGGREGATOR: &str = "aggregator";

/// Name of the `link`-th expander in the chain (`expand0` is fed by the tracker).
pub fn expander_name(link: usize) -> String {
    format!("expand{}", link)
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Completed requests in completion order.
    pub completed: Vec<CompletionReport>,
    /// Requests that produced no result before the run ended.
    pub missing: usize,
    pub restarts: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        if self.completed.is_empty() {
            return None;
        }
        let total: Duration = self.completed.iter().map(|r| r.latency).sum();
        Some(total / self.completed.len() as u32)
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.completed.iter().map(|r| r.latency).max()
    }
}

/// The search topology over one backend:
///
/// ```text
/// source -> tracker -> expand0 -> .. -> expand{D-1}
///                         \______________/
///                                |
///                          deduplicator -> mapper -> enricher -> aggregator -> tracker
/// ```
pub struct Pipeline {
    config: Config,
    backend: Arc<dyn ComputeBackend>,
    roots: Vec<String>,
}

impl Pipeline {
    pub fn new(config: Config, backend: Arc<dyn ComputeBackend>) -> Self {
        let roots = config.source.roots.clone();
        Self {
            config,
            backend,
            roots,
        }
    }

    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        self.roots = roots;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The configured request source.
    pub fn source(&self) -> RequestSource {
        RequestSource::new(
            self.roots.clone(),
            self.config.source.request_count,
            self.config.source.interval(),
        )
    }

    /// Declare every component and subscription. The tracker sends one
    /// report per completed request to `reports`.
    pub fn build_topology(
        &self,
        expected_total: usize,
        reports: UnboundedSender<CompletionReport>,
    ) -> TopologyBuilder {
        let cfg = &self.config;
        let depth = cfg.chain_depth.max(1);
        let terminal_expander = expander_name(depth - 1);
        let mut builder = TopologyBuilder::new();

        let mode = cfg.release_mode;
        builder
            .set_stage(
                TRACKER,
                1,
                Arc::new(move || {
                    Box::new(RequestTracker::new(
                        TRACKER,
                        mode,
                        Some(expected_total),
                        Some(reports.clone()),
                    )) as Box<dyn Stage>
                }),
            )
            .subscribe(SOURCE, Stream::Requests, Grouping::Shuffle)
            .subscribe(AGGREGATOR, Stream::Terminal, Grouping::ByRequest);

        for link in 0..depth {
            let name = expander_name(link);
            let backend = self.backend.clone();
            let stage_name = name.clone();
            let expander = builder.set_stage(
                &name,
                cfg.parallelism.expander,
                Arc::new(move || {
                    Box::new(Expander::new(stage_name.clone(), backend.clone())) as Box<dyn Stage>
                }),
            );
            if link == 0 {
                expander.subscribe(TRACKER, Stream::Data, Grouping::Shuffle);
            } else {
                expander.subscribe(&expander_name(link - 1), Stream::Data, Grouping::ByItem);
            }
        }

        let dedup = builder.set_stage(
            DEDUPLICATOR,
            cfg.parallelism.deduplicator,
            Arc::new(move || {
                Box::new(Deduplicator::new(DEDUPLICATOR, terminal_expander.clone())) as Box<dyn Stage>
            }),
        );
        for link in 0..depth {
            let producer = expander_name(link);
            dedup
                .subscribe(&producer, Stream::Count, Grouping::ByRequest)
                .subscribe(&producer, Stream::Data, Grouping::ByRequest);
        }

        let backend = self.backend.clone();
        let max_items = cfg.max_items_per_request;
        builder
            .set_stage(
                MAPPER,
                cfg.parallelism.mapper,
                Arc::new(move || {
                    Box::new(LimitedMapper::new(MAPPER, max_items, backend.clone())) as Box<dyn Stage>
                }),
            )
            .subscribe(DEDUPLICATOR, Stream::Data, Grouping::ByRequest)
            .subscribe(DEDUPLICATOR, Stream::Count, Grouping::ByRequest);

        let backend = self.backend.clone();
        builder
            .set_stage(
                ENRICHER,
                cfg.parallelism.enricher,
                Arc::new(move || Box::new(Enricher::new(ENRICHER, backend.clone())) as Box<dyn Stage>),
            )
            .subscribe(MAPPER, Stream::Data, Grouping::Shuffle);

        let backend = self.backend.clone();
        builder
            .set_stage(
                AGGREGATOR,
                cfg.parallelism.aggregator,
                Arc::new(move || {
                    Box::new(Aggregator::new(AGGREGATOR, backend.clone())) as Box<dyn Stage>
                }),
            )
            .subscribe(ENRICHER, Stream::Data, Grouping::ByRequest)
            .subscribe(MAPPER, Stream::Count, Grouping::ByRequest);

        builder
    }

    pub async fn run(&self) -> RunReport {
        self.run_with(self.source()).await
    }

    /// Feed every request from `source` and wait for their completions, or
    /// for the run timeout.
    pub async fn run_with(&self, source: RequestSource) -> RunReport {
        let started = Instant::now();
        let expected = source.request_count();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = self.build_topology(expected, tx);

        let (topology, feeder) = match self.config.release_mode {
            // The whole batch is queued ahead of the first completion, so the
            // tracker never finds its release queue empty early.
            ReleaseMode::Serialized => {
                for (request_id, root) in source {
                    builder.preload(request_envelope(request_id, root));
                }
                (builder.start(), None)
            }
            ReleaseMode::Parallel => {
                let topology = builder.start();
                let injector = topology.injector();
                let feeder = tokio::spawn(async move {
                    let interval = source.interval();
                    for (request_id, root) in source {
                        injector.inject(request_envelope(request_id, root));
                        if !interval.is_zero() {
                            tokio::time::sleep(interval).await;
                        }
                    }
                });
                (topology, Some(feeder))
            }
        };

        let mut completed = Vec::with_capacity(expected);
        let deadline = tokio::time::sleep(self.config.run_timeout());
        tokio::pin!(deadline);
        while completed.len() < expected {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!(
                        completed = completed.len(),
                        expected,
                        "run timed out waiting for completions"
                    );
                    break;
                }
                report = rx.recv() => match report {
                    Some(report) => completed.push(report),
                    None => break,
                },
            }
        }

        if let Some(feeder) = feeder {
            feeder.abort();
        }
        let restarts = topology.restarts();
        topology.shutdown().await;

        let report = RunReport {
            missing: expected.saturating_sub(completed.len()),
            completed,
            restarts,
            elapsed: started.elapsed(),
        };
        RunFinished {
            completed: report.completed.len(),
            missing: report.missing,
            restarts: report.restarts,
            elapsed: report.elapsed,
        }
        .log();
        report
    }
}

fn request_envelope(request_id: RequestId, root: String) -> Envelope {
    Envelope::new(SOURCE, Stream::Requests, Tuple::data(request_id, root))
}
