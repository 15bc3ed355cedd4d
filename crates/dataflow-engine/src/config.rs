//! Engine configuration
//!
//! Controls default label generation and the globals shared by every
//! pipeline built on a graph. Loaded from JSON; missing fields fall back to
//! their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::types::Record;

/// Default prefix for generated node labels
pub const DEFAULT_NODE_LABEL_PREFIX: &str = "node";

/// Default prefix for generated pipeline labels
pub const DEFAULT_PIPELINE_LABEL_PREFIX: &str = "pipeline";

/// Configuration for a `NodeGraph`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Prefix for labels generated for unlabelled nodes (`<prefix>_<n>`)
    pub node_label_prefix: String,
    /// Prefix for labels generated for unlabelled pipelines
    pub pipeline_label_prefix: String,
    /// Globals merged beneath each pipeline's own globals
    pub globals: Record,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_label_prefix: DEFAULT_NODE_LABEL_PREFIX.to_string(),
            pipeline_label_prefix: DEFAULT_PIPELINE_LABEL_PREFIX.to_string(),
            globals: Record::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No engine config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Set the prefix for generated node labels
    pub fn with_node_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.node_label_prefix = prefix.into();
        self
    }

    /// Set the prefix for generated pipeline labels
    pub fn with_pipeline_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.pipeline_label_prefix = prefix.into();
        self
    }

    /// Set the graph-wide globals
    pub fn with_globals(mut self, globals: Record) -> Self {
        self.globals = globals;
        self
    }

    /// Check that label prefixes are usable
    pub fn validate(&self) -> Result<()> {
        if self.node_label_prefix.trim().is_empty() {
            return Err(GraphError::Config(
                "nodeLabelPrefix must not be empty".to_string(),
            ));
        }
        if self.pipeline_label_prefix.trim().is_empty() {
            return Err(GraphError::Config(
                "pipelineLabelPrefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.node_label_prefix, "node");
        assert_eq!(config.pipeline_label_prefix, "pipeline");
        assert!(config.globals.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"nodeLabelPrefix": "step", "globals": {"seed": 7}}"#)
                .unwrap();
        assert_eq!(config.node_label_prefix, "step");
        assert_eq!(config.pipeline_label_prefix, "pipeline");
        assert_eq!(config.globals.get("seed"), Some(&json!(7)));
    }

    #[test]
    fn test_rejects_empty_prefix() {
        let err = EngineConfig::from_json_str(r#"{"pipelineLabelPrefix": " "}"#).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, GraphError::Serialization(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pipelineLabelPrefix": "pass"}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.pipeline_label_prefix, "pass");
        assert_eq!(config.node_label_prefix, "node");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("engine.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
