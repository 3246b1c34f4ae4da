// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process delivery substrate for the search topology.
//!
//! Components run as one or more worker tasks, each with its own unbounded
//! inbox. Emitted tuples are routed by subscription and grouping, so every
//! tuple of a request on a by-request stream reaches the same instance. That
//! single-owner delivery is what lets stages keep per-request state without
//! locks.
//!
//! # Modules
//! - `partition`: key to instance index
//! - `router`: subscription table and groupings
//! - `worker`: per-instance loop with crash-and-restart supervision
//! - `topology`: builder, running topology, injection and shutdown
//! - `pipeline`: the search topology wired from a `Config`, and `RunReport`

pub mod partition;
pub mod pipeline;
pub mod router;
pub mod topology;
mod worker;

#[cfg(test)]
mod integration_tests;

pub use partition::partition_for;
pub use pipeline::{expander_name, Pipeline, RunReport};
pub use router::{Grouping, Router};
pub use topology::{ComponentSpec, Injector, Topology, TopologyBuilder};
