// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::{GraphStoreBackend, SyntheticBackend};
use crate::config::{validate_config, BackendConfig, Config};
use crate::engine::Pipeline;
use crate::errors::ConfigError;
use crate::traits::ComputeBackend;

/// Pipeline builder: validates a configuration, creates its backend and
/// resolves the root vertices.
///
/// # Examples
///
/// ```
/// use pulse::config::{Config, PipelineBuilder};
///
/// let mut config = Config::default();
/// config.source.roots = vec!["106587101791064367906".to_string()];
///
/// let pipeline = PipelineBuilder::from_config(config).unwrap();
/// assert_eq!(pipeline.backend_name(), "synthetic");
/// assert_eq!(pipeline.roots(), ["106587101791064367906"]);
/// ```
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Build a pipeline over the backend named in the configuration.
    ///
    /// A graph file backend with no configured roots starts requests from
    /// every vertex in the graph.
    pub fn from_config(config: Config) -> Result<Pipeline, ConfigError> {
        validate_config(&config).map_err(|errors| ConfigError::Invalid { errors })?;

        match &config.backend {
            BackendConfig::Synthetic {
                fanout,
                images_per_vertex,
            } => {
                let backend = Arc::new(SyntheticBackend::new(*fanout, *images_per_vertex));
                Ok(Pipeline::new(config, backend))
            }
            BackendConfig::GraphFile { path } => {
                let path = path.clone().ok_or(ConfigError::MissingGraphPath)?;
                let backend = GraphStoreBackend::from_path(&path)?;
                let roots = if config.source.roots.is_empty() {
                    backend.vertex_ids()
                } else {
                    config.source.roots.clone()
                };
                if roots.is_empty() {
                    return Err(ConfigError::NoRootVertices);
                }
                Ok(Pipeline::new(config, Arc::new(backend)).with_roots(roots))
            }
        }
    }

    /// Build a pipeline over a caller-supplied backend. The configuration must
    /// name its roots.
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Pipeline, ConfigError> {
        validate_config(&config).map_err(|errors| ConfigError::Invalid { errors })?;
        if config.source.roots.is_empty() {
            return Err(ConfigError::NoRootVertices);
        }
        Ok(Pipeline::new(config, backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::ScriptedBackend;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config::default();
        assert!(matches!(
            PipelineBuilder::from_config(config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_with_backend_requires_roots() {
        let mut config = Config::default();
        config.backend = BackendConfig::GraphFile {
            path: Some("unused.yaml".to_string()),
        };
        let result = PipelineBuilder::with_backend(config, Arc::new(ScriptedBackend::new()));
        assert!(matches!(result, Err(ConfigError::NoRootVertices)));
    }

    #[test]
    fn test_missing_graph_file_is_an_io_error() {
        let mut config = Config::default();
        config.backend = BackendConfig::GraphFile {
            path: Some("/no/such/graph.yaml".to_string()),
        };
        assert!(matches!(
            PipelineBuilder::from_config(config),
            Err(ConfigError::Io { .. })
        ));
    }
}
