use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::StageError;
use crate::protocol::{Emitter, Envelope};

/// One partitioned component of the topology.
///
/// The engine guarantees a stage instance is driven by exactly one task and
/// sees every message for the keys its partition owns, so implementations keep
/// plain `&mut self` state with no locking.
#[async_trait]
pub trait Stage: Send {
    /// Handle one delivered tuple, pushing any output into `out`.
    ///
    /// An `Err` is fatal for this instance: the worker discards the stage and
    /// everything it was tracking and starts a fresh one.
    async fn handle(&mut self, envelope: Envelope, out: &mut Emitter) -> Result<(), StageError>;

    fn name(&self) -> &str;
}

/// Builds fresh stage instances, once per worker and again after each crash.
pub type StageFactory = Arc<dyn Fn() -> Box<dyn Stage> + Send + Sync>;
