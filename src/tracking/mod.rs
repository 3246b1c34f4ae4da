// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-request completion tracking.
//!
//! Every stateful stage owns one [`TrackingTable`] keyed by request id. An
//! entry is created on the first tuple that mentions a request, updated by
//! every later tuple, and sealed into a tombstone when the stage emits its
//! one aggregate message. Tombstones are never removed: a late or duplicated
//! tuple for a sealed request is recognised and dropped instead of opening a
//! brand new request.

mod state;
mod table;

pub use state::StageTrackingState;
pub use table::{SlotStatus, TrackingTable};
