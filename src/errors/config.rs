// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur while loading or validating a pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io {
        path: String,
        reason: String,
    },
    /// The configuration file could not be parsed
    Parse {
        path: String,
        reason: String,
    },
    /// The file extension does not map to a supported format
    UnsupportedFormat {
        path: String,
    },
    /// A numeric setting must be at least one
    MustBePositive {
        field: &'static str,
    },
    /// The source has no root vertices to start requests from
    NoRootVertices,
    /// A graph file backend was configured without a path
    MissingGraphPath,
    /// Validation found one or more problems
    Invalid {
        errors: Vec<ConfigError>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, reason } => {
                write!(f, "Failed to read config '{}': {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Failed to parse config '{}': {}", path, reason)
            }
            ConfigError::UnsupportedFormat { path } => {
                write!(
                    f,
                    "Unsupported config format for '{}': expected .yaml, .yml or .toml",
                    path
                )
            }
            ConfigError::MustBePositive { field } => {
                write!(f, "'{}' must be at least 1", field)
            }
            ConfigError::NoRootVertices => {
                write!(f, "source.roots is empty and the backend provides no vertices")
            }
            ConfigError::MissingGraphPath => {
                write!(f, "backend kind 'graph_file' requires a 'path'")
            }
            ConfigError::Invalid { errors } => {
                writeln!(f, "Configuration validation failed:")?;
                let messages: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
                write!(f, "{}", messages.join("\n"))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
