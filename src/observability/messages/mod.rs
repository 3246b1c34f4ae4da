// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `request` - request lifecycle as seen by the source and tracker
//! * `stage` - completion tracking inside stateful stages
//! * `backend` - recoverable backend failures
//! * `engine` - worker supervision and run summaries

use tracing::Span;

pub mod backend;
pub mod engine;
pub mod request;
pub mod stage;

/// Emit a message as a `tracing` event (or open a span) with its fields
/// attached, at the level the message type documents.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
