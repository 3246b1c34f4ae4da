// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

use crate::backends::MontageRegistry;
use crate::errors::BackendError;
use crate::traits::ComputeBackend;

/// Generates its graph on the fly: every vertex has `fanout` children and
/// `images_per_vertex` images. Never fails except on an empty montage.
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    fanout: usize,
    images_per_vertex: usize,
    registry: MontageRegistry,
}

impl SyntheticBackend {
    pub fn new(fanout: usize, images_per_vertex: usize) -> Self {
        Self {
            fanout,
            images_per_vertex,
            registry: MontageRegistry::default(),
        }
    }

    pub async fn montage_members(&self, key: &str) -> Option<BTreeSet<String>> {
        self.registry.members(key).await
    }
}

#[async_trait]
impl ComputeBackend for SyntheticBackend {
    async fn children(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        Ok((0..self.fanout).map(|i| format!("{}.{}", vertex, i)).collect())
    }

    async fn images_of(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        Ok((0..self.images_per_vertex)
            .map(|i| format!("{}/img{}", vertex, i))
            .collect())
    }

    async fn extract_features(&self, image: &str) -> Result<usize, BackendError> {
        Ok(image.len())
    }

    async fn montage(&self, images: &BTreeSet<String>) -> Result<String, BackendError> {
        self.registry.record(images).await
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
