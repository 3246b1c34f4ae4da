// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::protocol::RequestId;

/// Where a request stands on one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Absent,
    Active,
    Emitted,
}

#[derive(Debug)]
enum Slot<S> {
    Active(S),
    Emitted,
}

/// Key -> state map owned by a single worker instance.
#[derive(Debug)]
pub struct TrackingTable<S> {
    slots: HashMap<RequestId, Slot<S>>,
}

impl<S> Default for TrackingTable<S> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<S> TrackingTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable state for an active request, creating it with `init` on first
    /// sight. Returns `None` once the request has been sealed.
    pub fn track_with(&mut self, request_id: &RequestId, init: impl FnOnce() -> S) -> Option<&mut S> {
        let slot = self
            .slots
            .entry(request_id.clone())
            .or_insert_with(|| Slot::Active(init()));
        match slot {
            Slot::Active(state) => Some(state),
            Slot::Emitted => None,
        }
    }

    pub fn get(&self, request_id: &RequestId) -> Option<&S> {
        match self.slots.get(request_id) {
            Some(Slot::Active(state)) => Some(state),
            _ => None,
        }
    }

    pub fn status(&self, request_id: &RequestId) -> SlotStatus {
        match self.slots.get(request_id) {
            None => SlotStatus::Absent,
            Some(Slot::Active(_)) => SlotStatus::Active,
            Some(Slot::Emitted) => SlotStatus::Emitted,
        }
    }

    /// Replace the request's state with a tombstone, handing back the state it
    /// held so the caller can build its final message. Sealing is permanent.
    pub fn seal(&mut self, request_id: &RequestId) -> Option<S> {
        match self.slots.insert(request_id.clone(), Slot::Emitted) {
            Some(Slot::Active(state)) => Some(state),
            _ => None,
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    pub fn emitted_count(&self) -> usize {
        self.slots.len() - self.active_count()
    }
}

impl<S: Default> TrackingTable<S> {
    pub fn track(&mut self, request_id: &RequestId) -> Option<&mut S> {
        self.track_with(request_id, S::default)
    }
}
