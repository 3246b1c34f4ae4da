// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compute backend implementations for the search pipeline.
//!
//! Every backend implements [`ComputeBackend`](crate::traits::ComputeBackend)
//! and classifies its failures with [`BackendError`](crate::errors::BackendError)
//! so the stages can decide between degrading a request and crashing.
//!
//! # Available Backends
//!
//! ## Graph Store Backend
//! An in-memory social graph and image store loaded from a JSON or YAML file:
//! - **Vertices**: neighbors and attached images, optionally marked corrupt
//! - **Images**: feature counts, optionally marked corrupt
//! - **Failures**: unknown keys are store misses, corrupt records decode failures
//! - **Use Case**: reproducible runs over a captured graph
//!
//! ## Synthetic Backend
//! A generated graph with a fixed fan-out per vertex:
//! - **Children**: `v` expands to `v.0 .. v.{fanout-1}`
//! - **Images**: `v` carries `v/img0 .. v/img{n-1}`
//! - **Use Case**: load testing the topology without any data
//!
//! ## Stub Backend (Test-Only)
//! `ScriptedBackend` answers from per-key scripts and records its calls. Only
//! available in test builds.
//!
//! # Montages
//!
//! Both real backends derive the montage key from the image set and remember
//! which images each montage was built from:
//!
//! ```rust
//! use pulse::backends::SyntheticBackend;
//! use pulse::traits::ComputeBackend;
//! use std::collections::BTreeSet;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = SyntheticBackend::new(3, 2);
//! let images: BTreeSet<String> = ["a/img0", "a/img1"].iter().map(|s| s.to_string()).collect();
//!
//! let key = backend.montage(&images).await.unwrap();
//! assert_eq!(backend.montage_members(&key).await, Some(images));
//! # }
//! ```

pub mod memory;
pub mod synthetic;
#[cfg(test)]
pub mod stub;

pub use memory::{GraphData, GraphStoreBackend, ImageRecord, VertexRecord};
pub use synthetic::SyntheticBackend;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use tokio::sync::Mutex;

use crate::errors::BackendError;

/// Content-derived key for the montage of an image set.
pub fn montage_key(images: &BTreeSet<String>) -> String {
    let mut hasher = DefaultHasher::new();
    images.hash(&mut hasher);
    format!("montage-{:016x}", hasher.finish())
}

/// Remembers the members of every montage a backend produced.
///
/// Entries are never evicted, so memory grows with the number of distinct
/// montages over the backend's lifetime. Sized for test and load runs.
#[derive(Debug, Default)]
pub(crate) struct MontageRegistry {
    montages: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl MontageRegistry {
    pub(crate) async fn record(&self, images: &BTreeSet<String>) -> Result<String, BackendError> {
        if images.is_empty() {
            return Err(BackendError::ComputeFailure(
                "montage of an empty image set".to_string(),
            ));
        }
        let key = montage_key(images);
        self.montages
            .lock()
            .await
            .insert(key.clone(), images.clone());
        Ok(key)
    }

    pub(crate) async fn members(&self, key: &str) -> Option<BTreeSet<String>> {
        self.montages.lock().await.get(key).cloned()
    }
}
