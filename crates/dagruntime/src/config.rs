use dagcore::FlowError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the runtime.
///
/// Built once at startup (in code or from a TOML file) and handed to
/// [`crate::WorkflowRuntime::with_registry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on node tasks in flight within one batch
    pub max_parallel_nodes: usize,

    /// Capacity of the execution event broadcast channel
    pub event_buffer_size: usize,

    /// Optional limit on a single node invocation
    pub node_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: 10,
            event_buffer_size: 1000,
            node_timeout_ms: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML document; absent keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, FlowError> {
        let config: RuntimeConfig =
            toml::from_str(text).map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!("Loading runtime config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.max_parallel_nodes == 0 {
            return Err(FlowError::Config("max_parallel_nodes must be at least 1".into()));
        }
        if self.event_buffer_size == 0 {
            return Err(FlowError::Config("event_buffer_size must be at least 1".into()));
        }
        if self.node_timeout_ms == Some(0) {
            return Err(FlowError::Config("node_timeout_ms must be positive when set".into()));
        }
        Ok(())
    }

    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}
