// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic and operational log line in the pipeline is a message
//! struct with a `Display` implementation and a [`messages::StructuredLog`]
//! implementation that emits the same event with typed `tracing` fields.
//! Keeping them here keeps magic strings out of the stages.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::request` - request origination, release and completion
//! * `messages::stage` - per-request tracking inside partitioned stages
//! * `messages::backend` - absorbed backend failures and degraded results
//! * `messages::engine` - topology startup, worker crashes and restarts
//!
//! # Usage
//!
//! ```rust
//! use pulse::observability::messages::{stage::StageCompleted, StructuredLog};
//!
//! let msg = StageCompleted {
//!     stage: "deduplicator",
//!     request_id: "r-1",
//!     emitted_count: 12,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
