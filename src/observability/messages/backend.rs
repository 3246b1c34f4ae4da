// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for backend failures absorbed at a stage boundary.

use crate::errors::BackendError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A backend call failed with a recoverable class and the stage carried on.
///
/// # Log Level
/// `warn!` - Degraded behavior
///
/// # Example
/// ```
/// use pulse::errors::BackendError;
/// use pulse::observability::messages::backend::RecoverableBackendFailure;
///
/// let error = BackendError::TransientStoreMiss("vertex 9".into());
/// let msg = RecoverableBackendFailure {
///     stage: "expand0",
///     operation: "children",
///     key: "9",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct RecoverableBackendFailure<'a> {
    pub stage: &'a str,
    pub operation: &'a str,
    pub key: &'a str,
    pub error: &'a BackendError,
}

impl Display for RecoverableBackendFailure<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' {}('{}') failed, continuing: {}",
            self.stage, self.operation, self.key, self.error
        )
    }
}

impl StructuredLog for RecoverableBackendFailure<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            operation = self.operation,
            key = self.key,
            kind = self.error.kind(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "recoverable_backend_failure",
            span_name = name,
            stage = self.stage,
            operation = self.operation,
            kind = self.error.kind(),
        )
    }
}

/// Montage failed recoverably; a member image stands in for the result.
///
/// # Log Level
/// `warn!` - Degraded behavior
pub struct PlaceholderResult<'a> {
    pub request_id: &'a str,
    pub placeholder: &'a str,
    pub error: &'a BackendError,
}

impl Display for PlaceholderResult<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Montage for request '{}' failed ({}), using '{}' as placeholder",
            self.request_id, self.error, self.placeholder
        )
    }
}

impl StructuredLog for PlaceholderResult<'_> {
    fn log(&self) {
        tracing::warn!(
            request_id = self.request_id,
            placeholder = self.placeholder,
            kind = self.error.kind(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "placeholder_result",
            span_name = name,
            request_id = self.request_id,
        )
    }
}
