// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // compute backends
pub mod config;        // config loading + pipeline builder
pub mod engine;        // delivery substrate + topology runtime
pub mod errors;        // error handling
pub mod observability;
pub mod protocol;      // tuples, streams, emitter
pub mod stages;        // partitioned components
pub mod tracking;      // per-request completion state
pub mod traits;        // unified abstractions
