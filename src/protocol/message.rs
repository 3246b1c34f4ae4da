// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, globally unique request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Logical stream a tuple is emitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    /// New requests: `(RequestID, root item)`.
    Requests,
    /// Fan-out data: `(RequestID, item)`.
    Data,
    /// Expected-count announcements: `(RequestID, count)`.
    Count,
    /// One per finished request: `(RequestID, result)`.
    Terminal,
}

/// The two-field message carried on every stream. Serializes as a
/// two-element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple(pub RequestId, pub String);

impl Tuple {
    pub fn data(request_id: RequestId, item: impl Into<String>) -> Self {
        Self(request_id, item.into())
    }

    pub fn count(request_id: RequestId, count: u64) -> Self {
        Self(request_id, count.to_string())
    }

    pub fn terminal(request_id: RequestId, result: impl Into<String>) -> Self {
        Self(request_id, result.into())
    }

    pub fn request_id(&self) -> &RequestId {
        &self.0
    }

    pub fn value(&self) -> &str {
        &self.1
    }

    /// Parse the value field as a count.
    pub fn count_value(&self) -> Result<u64, ProtocolError> {
        self.1
            .trim()
            .parse::<u64>()
            .map_err(|_| ProtocolError::MalformedCount {
                request_id: self.0.clone(),
                value: self.1.clone(),
            })
    }
}

/// A tuple in flight, tagged with the component that produced it and the
/// stream it was emitted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: String,
    pub stream: Stream,
    pub tuple: Tuple,
}

impl Envelope {
    pub fn new(source: impl Into<String>, stream: Stream, tuple: Tuple) -> Self {
        Self {
            source: source.into(),
            stream,
            tuple,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        self.tuple.request_id()
    }
}
