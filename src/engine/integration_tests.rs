// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end runs of the search topology over in-memory backends.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::stub::ScriptedBackend;
use crate::backends::{GraphData, GraphStoreBackend, SyntheticBackend, VertexRecord};
use crate::config::{Config, ParallelismConfig, ReleaseMode};
use crate::engine::Pipeline;
use crate::errors::BackendError;
use crate::stages::RequestSource;

fn config(request_count: usize, roots: &[&str]) -> Config {
    let mut cfg = Config::default();
    cfg.source.request_count = request_count;
    cfg.source.roots = roots.iter().map(|r| r.to_string()).collect();
    cfg.run_timeout_seconds = 10;
    cfg
}

fn wide() -> ParallelismConfig {
    ParallelismConfig {
        expander: 3,
        deduplicator: 2,
        mapper: 2,
        enricher: 3,
        aggregator: 2,
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_synthetic_requests_all_complete() {
    let mut cfg = config(8, &["a", "b", "c"]);
    cfg.parallelism = wide();
    let backend = Arc::new(SyntheticBackend::new(4, 2));
    let pipeline = Pipeline::new(cfg, backend.clone());

    let report = pipeline.run().await;

    assert!(report.is_complete(), "missing {}", report.missing);
    assert_eq!(report.completed.len(), 8);
    assert_eq!(report.restarts, 0);

    // One root, four children, two images each.
    let members = backend
        .montage_members(&report.completed[0].result)
        .await
        .unwrap();
    assert_eq!(members.len(), 8);
}

#[tokio::test]
async fn test_two_link_chain_covers_both_levels() {
    let mut cfg = config(2, &["r"]);
    cfg.chain_depth = 2;
    cfg.parallelism = wide();
    let backend = Arc::new(SyntheticBackend::new(3, 1));
    let pipeline = Pipeline::new(cfg, backend.clone());

    let report = pipeline.run().await;

    assert!(report.is_complete());
    for completion in &report.completed {
        let members = backend.montage_members(&completion.result).await.unwrap();
        // 3 children plus 9 grandchildren.
        assert_eq!(members.len(), 12);
        assert!(members.contains("r.0/img0"));
        assert!(members.contains("r.2.1/img0"));
    }
}

#[tokio::test]
async fn test_mapper_cap_bounds_montage() {
    let mut cfg = config(3, &["r"]);
    cfg.max_items_per_request = 5;
    let backend = Arc::new(SyntheticBackend::new(10, 2));
    let pipeline = Pipeline::new(cfg, backend.clone());

    let report = pipeline.run().await;

    assert!(report.is_complete());
    for completion in &report.completed {
        let members = backend.montage_members(&completion.result).await.unwrap();
        assert!(!members.is_empty() && members.len() <= 5);
    }
}

#[tokio::test]
async fn test_serialized_mode_runs_one_request_at_a_time() {
    let mut cfg = config(4, &["a", "b"]);
    cfg.release_mode = ReleaseMode::Serialized;
    cfg.parallelism = wide();
    let pipeline = Pipeline::new(cfg, Arc::new(SyntheticBackend::new(3, 1)));

    let source = RequestSource::new(pipeline.roots().to_vec(), 4, Duration::ZERO).with_prefix("s");
    let report = pipeline.run_with(source).await;

    assert!(report.is_complete());
    assert_eq!(report.restarts, 0);
    let order: Vec<&str> = report
        .completed
        .iter()
        .map(|c| c.request_id.as_str())
        .collect();
    assert_eq!(order, vec!["s-0", "s-1", "s-2", "s-3"]);
}

#[tokio::test]
async fn test_shared_neighbors_are_deduplicated() {
    let mut graph = GraphData::default();
    let vertex = |neighbors: &[&str], images: &[&str]| VertexRecord {
        neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
        images: images.iter().map(|s| s.to_string()).collect(),
        corrupt: false,
    };
    graph.vertices.insert("me".into(), vertex(&["ann", "bob"], &[]));
    graph.vertices.insert("ann".into(), vertex(&["bob", "cat"], &["ann.jpg"]));
    graph.vertices.insert("bob".into(), vertex(&["ann", "cat"], &["bob.jpg", "shared.jpg"]));
    graph.vertices.insert("cat".into(), vertex(&[], &["cat.jpg", "shared.jpg"]));
    for image in ["ann.jpg", "bob.jpg", "cat.jpg", "shared.jpg"] {
        graph.images.insert(image.into(), Default::default());
    }
    let backend = Arc::new(GraphStoreBackend::from_data(graph));

    let mut cfg = config(1, &["me"]);
    cfg.chain_depth = 2;
    let pipeline = Pipeline::new(cfg, backend.clone());

    let report = pipeline.run().await;

    assert!(report.is_complete());
    let members = backend
        .montage_members(&report.completed[0].result)
        .await
        .unwrap();
    assert_eq!(members, set(&["ann.jpg", "bob.jpg", "cat.jpg", "shared.jpg"]));
}

#[tokio::test]
async fn test_recoverable_branch_failure_degrades_but_completes() {
    let backend = ScriptedBackend::new()
        .with_children("root", &["good", "bad"])
        .with_children("good", &["leaf"])
        .failing_children("bad", BackendError::TransientStoreMiss("bad".into()))
        .with_images("good", &["good.jpg"])
        .with_images("leaf", &["leaf.jpg"])
        .with_images("bad", &["bad.jpg"])
        .montage_returns("montage");
    let mut cfg = config(1, &["root"]);
    cfg.chain_depth = 2;
    let pipeline = Pipeline::new(cfg, Arc::new(backend));

    let report = pipeline.run().await;

    assert!(report.is_complete());
    assert_eq!(report.completed[0].result, "montage");
}

#[tokio::test]
async fn test_placeholder_result_when_montage_fails() {
    let backend = ScriptedBackend::new()
        .with_children("root", &["only"])
        .with_images("only", &["only.jpg"])
        .montage_fails(BackendError::ComputeFailure("out of memory".into()));
    let pipeline = Pipeline::new(config(1, &["root"]), Arc::new(backend));

    let report = pipeline.run().await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].result, "only.jpg");
}

#[tokio::test]
async fn test_crashed_expander_loses_only_its_request() {
    let backend = ScriptedBackend::new()
        .with_children("ok", &["x"])
        .with_children("doomed", &["y"])
        .crash_once_on_children("doomed")
        .with_images("x", &["x.jpg"])
        .with_images("y", &["y.jpg"]);
    let mut cfg = config(2, &["doomed", "ok"]);
    cfg.run_timeout_seconds = 1;
    let pipeline = Pipeline::new(cfg, Arc::new(backend));

    let report = pipeline.run().await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.missing, 1);
    assert_eq!(report.restarts, 1);
}
