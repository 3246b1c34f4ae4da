// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire types shared by every stage.
//!
//! All streams carry the same two-field tuple: the request id first, then a
//! stream-specific value (an item key, a decimal count, or a result key).
//! The producing component's name travels alongside in the [`Envelope`] so a
//! stage can tell which link of the expansion chain a count came from.

mod emitter;
mod message;

pub use emitter::Emitter;
pub use message::{Envelope, RequestId, Stream, Tuple};
