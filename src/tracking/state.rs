// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

/// Counters and dedup set for one request on one stage.
///
/// Counts and data may arrive in any order from any number of producers, so
/// every predicate below is evaluated after *each* message, on both the count
/// path and the data path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageTrackingState {
    /// Data messages processed, duplicates included.
    pub items_received: u64,
    /// Running total assembled from count messages.
    pub items_expected: u64,
    pub count_messages_received: u64,
    /// Count messages the barrier must see before it may close.
    pub count_messages_expected: u64,
    /// Derived items forwarded by a bounded stage.
    pub items_sent: u64,
    pub seen: BTreeSet<String>,
}

impl StageTrackingState {
    /// State for a barrier that starts out waiting for the root expansion's
    /// count message.
    pub fn barrier() -> Self {
        Self {
            count_messages_expected: 1,
            ..Self::default()
        }
    }

    fn has_inputs(&self) -> bool {
        self.items_received > 0 && self.count_messages_received > 0
    }

    /// Barrier close: every expected item and every expected count message
    /// has been seen.
    pub fn barrier_done(&self) -> bool {
        self.has_inputs()
            && self.items_expected > 0
            && self.items_received >= self.items_expected
            && self.count_messages_received >= self.count_messages_expected
    }

    /// Bounded close: either all source items were seen or the cap on
    /// forwarded items was reached.
    pub fn bounded_done(&self, max_items: u64) -> bool {
        self.has_inputs()
            && self.items_sent > 0
            && (self.items_received >= self.items_expected || self.items_sent >= max_items)
    }

    /// Aggregate close: the single count message arrived and all items it
    /// announced were received.
    pub fn aggregate_done(&self) -> bool {
        self.has_inputs() && self.items_expected > 0 && self.items_received >= self.items_expected
    }
}
