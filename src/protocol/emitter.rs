// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::protocol::{RequestId, Stream, Tuple};

/// Collects the tuples a stage emits while handling one input.
///
/// The worker only routes them once `Stage::handle` returns `Ok`, so a fatal
/// error never leaks half of a fan-out downstream.
#[derive(Debug, Default)]
pub struct Emitter {
    outbound: Vec<(Stream, Tuple)>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, stream: Stream, tuple: Tuple) {
        self.outbound.push((stream, tuple));
    }

    pub fn emit_data(&mut self, request_id: RequestId, item: impl Into<String>) {
        self.emit(Stream::Data, Tuple::data(request_id, item));
    }

    pub fn emit_count(&mut self, request_id: RequestId, count: u64) {
        self.emit(Stream::Count, Tuple::count(request_id, count));
    }

    pub fn emit_terminal(&mut self, request_id: RequestId, result: impl Into<String>) {
        self.emit(Stream::Terminal, Tuple::terminal(request_id, result));
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    pub fn outbound(&self) -> &[(Stream, Tuple)] {
        &self.outbound
    }

    /// Values emitted on one stream, in emission order.
    pub fn values_on(&self, stream: Stream) -> Vec<&str> {
        self.outbound
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, t)| t.value())
            .collect()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (Stream, Tuple)> {
        self.outbound.drain(..)
    }
}
