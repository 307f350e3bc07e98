//! Router configuration.
//!
//! ```toml
//! admission_limit = 5
//!
//! [[backends]]
//! id = "server1"
//! weight = 1
//!
//! [[backends]]
//! id = "server2"
//! weight = 2
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::backend::BackendId;
use crate::error::ConfigError;

fn default_admission_limit() -> usize {
    5
}

fn default_weight() -> u32 {
    1
}

/// Configuration for a [`Router`](crate::Router).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Maximum concurrently admitted requests across all backends
    #[serde(default = "default_admission_limit")]
    pub admission_limit: usize,

    /// Initial backends, in membership order
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            admission_limit: default_admission_limit(),
            backends: Vec::new(),
        }
    }
}

/// One configured backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend identity
    pub id: String,

    /// Scheduling weight (must be positive)
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl BackendConfig {
    /// Create a backend entry.
    pub fn new(id: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

impl RouterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            backends = config.backends.len(),
            "loaded router configuration"
        );
        Ok(config)
    }

    /// Check limits, weights and id uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission_limit == 0 {
            return Err(ConfigError::ZeroAdmissionLimit);
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            let id = BackendId(backend.id.clone());
            if backend.weight == 0 {
                return Err(ConfigError::ZeroWeight(id));
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigError::DuplicateBackend(id));
            }
        }
        Ok(())
    }
}
