// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod backend;
mod config;
mod protocol;
mod stage;

pub use backend::BackendError;
pub use config::ConfigError;
pub use protocol::ProtocolError;
pub use stage::StageError;
