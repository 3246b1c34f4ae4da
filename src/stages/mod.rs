// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The partitioned components of the search topology, leaf first.
//!
//! ```text
//! source -> tracker -> expand0 .. expandN -> deduplicator -> mapper -> enricher -> aggregator -> tracker
//! ```
//!
//! Stateless stages (`Expander`, `Enricher`) may receive any tuple on any
//! instance. Stateful stages (`Deduplicator`, `LimitedMapper`, `Aggregator`,
//! `RequestTracker`) rely on the engine routing every tuple of a request to
//! the same instance.

pub mod aggregator;
pub mod deduplicator;
pub mod enricher;
pub mod expander;
pub mod mapper;
pub mod source;
pub mod tracker;

pub use aggregator::Aggregator;
pub use deduplicator::Deduplicator;
pub use enricher::Enricher;
pub use expander::Expander;
pub use mapper::LimitedMapper;
pub use source::RequestSource;
pub use tracker::{CompletionReport, RequestTracker};

use crate::errors::ProtocolError;
use crate::protocol::Envelope;

pub(crate) fn unexpected_stream(stage: &str, envelope: &Envelope) -> ProtocolError {
    ProtocolError::UnexpectedStream {
        stage: stage.to_string(),
        stream: envelope.stream,
        source_component: envelope.source.clone(),
    }
}

/// Sort a backend result so emission order does not depend on hash order.
pub(crate) fn sorted(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut items: Vec<String> = items.into_iter().collect();
    items.sort();
    items
}
