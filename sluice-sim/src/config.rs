//! Simulation configuration: the router plus the synthetic workload driving it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sluice_core::{BackendConfig, ConfigError, RouterConfig};

/// Top-level simulation file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Router under test
    pub router: RouterConfig,
    /// Shape of the generated load
    pub workload: WorkloadConfig,
    /// Optional operator toggling a backend's health
    pub chaos: Option<ChaosConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig {
                admission_limit: 10,
                backends: vec![
                    BackendConfig::new("server1", 1),
                    BackendConfig::new("server2", 1),
                    BackendConfig::new("server3", 2),
                ],
            },
            workload: WorkloadConfig::default(),
            chaos: None,
        }
    }
}

/// Synthetic request stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Total requests to send
    pub requests: usize,
    /// Distinct client ids, assigned round robin
    pub clients: usize,
    /// Processing time of every request in milliseconds
    pub processing_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            requests: 90,
            clients: 90,
            processing_ms: 100,
        }
    }
}

/// Periodic crash/recover of one backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// Backend to toggle
    pub backend: String,
    /// Time between toggles in milliseconds
    pub interval_ms: u64,
}

impl SimConfig {
    /// Read and parse a simulation file, validating the router section.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a simulation document, validating the router section.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.router.validate()?;
        Ok(config)
    }
}
