// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{BackendError, ProtocolError};
use thiserror::Error;

/// Error surfaced by `Stage::handle`. Recoverable backend failures never get
/// this far, so every value of this type stops the worker instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `Stage::handle` panicked; the payload message, if it had one.
    #[error("Stage panicked: {0}")]
    Panicked(String),
}
