// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::backends::MontageRegistry;
use crate::errors::{BackendError, ConfigError};
use crate::traits::ComputeBackend;

/// A vertex of the social graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    #[serde(default)]
    pub neighbors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// The stored record cannot be decoded.
    #[serde(default)]
    pub corrupt: bool,
}

/// An image in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub features: usize,
    /// The image data is unusable; feature extraction and montage fail on it.
    #[serde(default)]
    pub corrupt: bool,
}

/// On-disk shape of a graph file.
///
/// ```yaml
/// vertices:
///   alice: { neighbors: [bob, carol], images: [a1] }
///   bob:   { neighbors: [alice], images: [b1, b2] }
///   carol: { corrupt: true }
/// images:
///   a1: { features: 812 }
///   b1: { features: 90 }
///   b2: { corrupt: true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub vertices: HashMap<String, VertexRecord>,
    #[serde(default)]
    pub images: HashMap<String, ImageRecord>,
}

/// Graph and image store held in memory.
///
/// Unknown keys are store misses and corrupt records are decode failures, so a
/// partial or damaged graph degrades requests instead of crashing workers.
#[derive(Debug)]
pub struct GraphStoreBackend {
    graph: GraphData,
    registry: MontageRegistry,
}

impl GraphStoreBackend {
    pub fn from_data(graph: GraphData) -> Self {
        Self {
            graph,
            registry: MontageRegistry::default(),
        }
    }

    /// Load a graph from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: shown.clone(),
            reason: e.to_string(),
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let graph: GraphData = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: shown.clone(),
                reason: e.to_string(),
            })?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: shown.clone(),
                    reason: e.to_string(),
                })?
            }
            _ => return Err(ConfigError::UnsupportedFormat { path: shown }),
        };

        tracing::info!(
            path = %shown,
            vertices = graph.vertices.len(),
            images = graph.images.len(),
            "Loaded graph"
        );
        Ok(Self::from_data(graph))
    }

    /// All vertex ids, sorted.
    pub fn vertex_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.graph.vertices.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn montage_members(&self, key: &str) -> Option<BTreeSet<String>> {
        self.registry.members(key).await
    }

    fn vertex(&self, vertex: &str) -> Result<&VertexRecord, BackendError> {
        match self.graph.vertices.get(vertex) {
            None => Err(BackendError::TransientStoreMiss(format!("vertex '{}'", vertex))),
            Some(record) if record.corrupt => Err(BackendError::DecodeFailure(format!(
                "vertex '{}' has an undecodable record",
                vertex
            ))),
            Some(record) => Ok(record),
        }
    }

    fn image(&self, image: &str) -> Result<&ImageRecord, BackendError> {
        self.graph
            .images
            .get(image)
            .ok_or_else(|| BackendError::TransientStoreMiss(format!("image '{}'", image)))
    }
}

#[async_trait]
impl ComputeBackend for GraphStoreBackend {
    async fn children(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        Ok(self.vertex(vertex)?.neighbors.iter().cloned().collect())
    }

    async fn images_of(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        Ok(self.vertex(vertex)?.images.iter().cloned().collect())
    }

    async fn extract_features(&self, image: &str) -> Result<usize, BackendError> {
        let record = self.image(image)?;
        if record.corrupt {
            return Err(BackendError::ComputeFailure(format!(
                "no features extracted from '{}'",
                image
            )));
        }
        Ok(record.features)
    }

    async fn montage(&self, images: &BTreeSet<String>) -> Result<String, BackendError> {
        for image in images {
            if self.image(image)?.corrupt {
                return Err(BackendError::DecodeFailure(format!(
                    "image '{}' cannot be decoded for montage",
                    image
                )));
            }
        }
        self.registry.record(images).await
    }

    fn name(&self) -> &'static str {
        "graph_store"
    }
}
