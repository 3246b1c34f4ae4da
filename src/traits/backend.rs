use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

use crate::errors::BackendError;

/// The graph/vision capability every stage calls into.
///
/// Calls may be slow (network or GPU bound). Each worker instance awaits its
/// own call, so a stalled call only holds up the requests routed to that
/// instance.
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Neighbors of a vertex in the social graph.
    async fn children(&self, vertex: &str) -> Result<HashSet<String>, BackendError>;

    /// Images attached to a vertex.
    async fn images_of(&self, vertex: &str) -> Result<HashSet<String>, BackendError>;

    /// Run feature extraction on an image, returning the number of features.
    async fn extract_features(&self, image: &str) -> Result<usize, BackendError>;

    /// Render a montage of the given images, returning the new image's key.
    async fn montage(&self, images: &BTreeSet<String>) -> Result<String, BackendError>;

    fn name(&self) -> &'static str;
}
