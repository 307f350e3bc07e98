//! Error types surfaced by the router and its configuration layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::backend::BackendId;

/// Failures reported to the caller of [`Router::route`](crate::Router::route).
#[derive(Debug, Error)]
pub enum RouteError {
    /// No registered backend was alive when the scheduler ran.
    #[error("no alive backend available")]
    NoAliveBackend,

    /// The router stopped admitting requests.
    #[error("router is closed")]
    Closed,

    /// The backend's workload failed. Both slots were released.
    #[error("backend {backend} failed to process request: {source}")]
    Processing {
        /// Backend that ran the request
        backend: BackendId,
        /// Error raised by the workload
        #[source]
        source: WorkError,
    },
}

/// Failure raised by a [`Workload`](crate::Workload).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkError {
    message: String,
}

impl WorkError {
    /// Create a work error carrying a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message this error was created with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while building backends and routers, or loading their config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Backend weights must be positive.
    #[error("backend {0} has zero weight")]
    ZeroWeight(BackendId),

    /// The admission limit must allow at least one request through.
    #[error("admission limit must be at least 1")]
    ZeroAdmissionLimit,

    /// The admission limit exceeds what the semaphore can represent.
    #[error("admission limit {limit} exceeds maximum of {max}")]
    AdmissionLimitTooLarge {
        /// Requested limit
        limit: usize,
        /// Largest supported limit
        max: usize,
    },

    /// Two configured backends share an id.
    #[error("duplicate backend id {0}")]
    DuplicateBackend(BackendId),
}
