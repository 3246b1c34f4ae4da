// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every check runs, and every violation is reported, so one edit can fix a
//! config instead of one edit per error.
//!
//! # Checks
//!
//! 1. **Sizes**: chain depth, item cap, request count and every parallelism
//!    setting must be at least one
//! 2. **Backend**: a graph file backend needs a path; a synthetic graph needs a
//!    non-zero fan-out
//! 3. **Roots**: a synthetic backend has no vertex list of its own, so the
//!    source must name its roots
//!
//! # Example
//! ```rust
//! use pulse::config::{validate_config, Config};
//! use pulse::errors::ConfigError;
//!
//! let mut config = Config::default();
//! config.source.roots = vec!["v1".to_string()];
//! assert!(validate_config(&config).is_ok());
//!
//! config.max_items_per_request = 0;
//! assert_eq!(
//!     validate_config(&config),
//!     Err(vec![ConfigError::MustBePositive { field: "max_items_per_request" }])
//! );
//! ```

use crate::config::{BackendConfig, Config};
use crate::errors::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let sizes: [(&'static str, u64); 8] = [
        ("chain_depth", config.chain_depth as u64),
        ("max_items_per_request", config.max_items_per_request),
        ("source.request_count", config.source.request_count as u64),
        ("parallelism.expander", config.parallelism.expander as u64),
        ("parallelism.deduplicator", config.parallelism.deduplicator as u64),
        ("parallelism.mapper", config.parallelism.mapper as u64),
        ("parallelism.enricher", config.parallelism.enricher as u64),
        ("parallelism.aggregator", config.parallelism.aggregator as u64),
    ];
    for (field, value) in sizes {
        if value == 0 {
            errors.push(ConfigError::MustBePositive { field });
        }
    }

    match &config.backend {
        BackendConfig::Synthetic { fanout, .. } => {
            if *fanout == 0 {
                errors.push(ConfigError::MustBePositive {
                    field: "backend.fanout",
                });
            }
            if config.source.roots.is_empty() {
                errors.push(ConfigError::NoRootVertices);
            }
        }
        BackendConfig::GraphFile { path } => {
            if path.as_deref().map_or(true, |p| p.trim().is_empty()) {
                errors.push(ConfigError::MissingGraphPath);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
