// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_CHAIN_DEPTH, DEFAULT_MAX_ITEMS_PER_REQUEST, DEFAULT_PARALLELISM,
    DEFAULT_REQUEST_COUNT, DEFAULT_RUN_TIMEOUT_SECONDS, DEFAULT_SYNTHETIC_FANOUT,
    DEFAULT_SYNTHETIC_IMAGES_PER_VERTEX,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for a search pipeline run.
///
/// Every field has a default, so an empty file is a valid (synthetic) config.
///
/// # Fields
/// * `chain_depth` - Expander links between the tracker and the deduplicator
/// * `max_items_per_request` - Cap on images the mapper forwards per request
/// * `release_mode` - Whether requests run concurrently or one at a time
/// * `run_timeout_seconds` - How long to wait for completions before giving up
/// * `source` - How many requests to emit, how fast, and from which roots
/// * `parallelism` - Worker instances per partitioned component
/// * `backend` - Which compute backend serves the graph and image calls
///
/// # Example
/// ```yaml
/// chain_depth: 2
/// max_items_per_request: 50
/// release_mode: serialized
/// run_timeout_seconds: 30
/// source:
///   request_count: 20
///   interval_ms: 5
///   roots: ["106587101791064367906"]
/// parallelism:
///   expander: 4
///   mapper: 2
/// backend:
///   kind: synthetic
///   fanout: 8
///   images_per_vertex: 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_chain_depth")]
    pub chain_depth: usize,
    #[serde(default = "default_max_items_per_request")]
    pub max_items_per_request: u64,
    #[serde(default)]
    pub release_mode: ReleaseMode,
    #[serde(default = "default_run_timeout_seconds")]
    pub run_timeout_seconds: u64,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub parallelism: ParallelismConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_depth: DEFAULT_CHAIN_DEPTH,
            max_items_per_request: DEFAULT_MAX_ITEMS_PER_REQUEST,
            release_mode: ReleaseMode::default(),
            run_timeout_seconds: DEFAULT_RUN_TIMEOUT_SECONDS,
            source: SourceConfig::default(),
            parallelism: ParallelismConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }
}

/// How the tracker admits requests into the topology.
///
/// # Variants
/// * `Parallel` - Every request is released as soon as it arrives
/// * `Serialized` - One request in flight; the rest wait in FIFO order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMode {
    #[default]
    Parallel,
    Serialized,
}

/// Request generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_request_count")]
    pub request_count: usize,
    /// Delay between requests in parallel mode.
    #[serde(default)]
    pub interval_ms: u64,
    /// Root vertices, cycled in order. May be empty for a graph file backend,
    /// in which case every vertex of the graph is a root.
    #[serde(default)]
    pub roots: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            request_count: DEFAULT_REQUEST_COUNT,
            interval_ms: 0,
            roots: Vec::new(),
        }
    }
}

impl SourceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Worker instances per component. The tracker always runs as one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelismConfig {
    #[serde(default = "default_parallelism")]
    pub expander: usize,
    #[serde(default = "default_parallelism")]
    pub deduplicator: usize,
    #[serde(default = "default_parallelism")]
    pub mapper: usize,
    #[serde(default = "default_parallelism")]
    pub enricher: usize,
    #[serde(default = "default_parallelism")]
    pub aggregator: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            expander: DEFAULT_PARALLELISM,
            deduplicator: DEFAULT_PARALLELISM,
            mapper: DEFAULT_PARALLELISM,
            enricher: DEFAULT_PARALLELISM,
            aggregator: DEFAULT_PARALLELISM,
        }
    }
}

/// Compute backend selection.
///
/// # Example
/// ```yaml
/// backend:
///   kind: graph_file
///   path: graphs/egonet.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Synthetic {
        #[serde(default = "default_fanout")]
        fanout: usize,
        #[serde(default = "default_images_per_vertex")]
        images_per_vertex: usize,
    },
    GraphFile {
        /// Relative paths are resolved against the config file's directory.
        #[serde(default)]
        path: Option<String>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Synthetic {
            fanout: DEFAULT_SYNTHETIC_FANOUT,
            images_per_vertex: DEFAULT_SYNTHETIC_IMAGES_PER_VERTEX,
        }
    }
}

fn default_chain_depth() -> usize {
    DEFAULT_CHAIN_DEPTH
}

fn default_max_items_per_request() -> u64 {
    DEFAULT_MAX_ITEMS_PER_REQUEST
}

fn default_run_timeout_seconds() -> u64 {
    DEFAULT_RUN_TIMEOUT_SECONDS
}

fn default_request_count() -> usize {
    DEFAULT_REQUEST_COUNT
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

fn default_fanout() -> usize {
    DEFAULT_SYNTHETIC_FANOUT
}

fn default_images_per_vertex() -> usize {
    DEFAULT_SYNTHETIC_IMAGES_PER_VERTEX
}

/// Load a config from a `.yaml`, `.yml` or `.toml` file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let mut cfg: Config = match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display.clone(),
                reason: e.to_string(),
            })?
        }
        Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display.clone(),
            reason: e.to_string(),
        })?,
        _ => return Err(ConfigError::UnsupportedFormat { path: display }),
    };

    if let BackendConfig::GraphFile {
        path: Some(graph_path),
    } = &mut cfg.backend
    {
        if let Some(base) = path.parent() {
            if Path::new(graph_path.as_str()).is_relative() {
                *graph_path = base.join(graph_path.as_str()).display().to_string();
            }
        }
    }

    Ok(cfg)
}

/// Load a config and reject it if validation finds any problem.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(|errors| ConfigError::Invalid { errors })?;
    Ok(cfg)
}
