// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Classified failures returned by the compute backend.
//!
//! Stages never match on backend error *types*; they ask the error for its
//! class. Store misses, decode failures and compute failures degrade a request
//! (fewer items, or a placeholder result). Anything else stops the worker.

use thiserror::Error;

/// A failed backend call, classified by how the caller must react.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Key not found in the store. Treated as an empty result.
    #[error("Store miss: {0}")]
    TransientStoreMiss(String),

    /// The backend returned a payload that could not be decoded.
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// A compute step (feature extraction, montage) failed, e.g. out of memory.
    #[error("Compute failure: {0}")]
    ComputeFailure(String),

    /// Anything the worker cannot continue from.
    #[error("Unrecoverable backend failure: {0}")]
    Unrecoverable(String),
}

impl BackendError {
    /// True for the classes a stage absorbs at its boundary.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BackendError::Unrecoverable(_))
    }

    /// Short class label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::TransientStoreMiss(_) => "transient_store_miss",
            BackendError::DecodeFailure(_) => "decode_failure",
            BackendError::ComputeFailure(_) => "compute_failure",
            BackendError::Unrecoverable(_) => "unrecoverable",
        }
    }
}
