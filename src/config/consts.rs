// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Number of expander links between the tracker and the deduplicator
pub const DEFAULT_CHAIN_DEPTH: usize = 1;
/// Images the mapper forwards per request before it closes early
pub const DEFAULT_MAX_ITEMS_PER_REQUEST: u64 = 50;
/// How long a run waits for outstanding completions (seconds)
pub const DEFAULT_RUN_TIMEOUT_SECONDS: u64 = 60;
/// Requests emitted by the source when not configured
pub const DEFAULT_REQUEST_COUNT: usize = 10;
/// Worker instances per partitioned component
pub const DEFAULT_PARALLELISM: usize = 1;
/// Children per vertex in the synthetic graph
pub const DEFAULT_SYNTHETIC_FANOUT: usize = 10;
/// Images per vertex in the synthetic graph
pub const DEFAULT_SYNTHETIC_IMAGES_PER_VERTEX: usize = 2;
