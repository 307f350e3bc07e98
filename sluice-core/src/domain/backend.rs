//! Backend server models.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::domain::request::Request;
use crate::domain::workload::{Sleep, Workload};
use crate::error::{ConfigError, RouteError, WorkError};

/// A unique identifier for a backend server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub String);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Represents a single upstream backend server.
///
/// A backend runs at most one request at a time when dispatched through the
/// router, tracks whether it is alive, and remembers every request it has
/// finished processing.
#[derive(Debug)]
pub struct Backend {
    /// The unique ID of the backend
    id: BackendId,
    /// Static scheduling weight
    weight: NonZeroU32,
    /// Whether the backend is currently accepting new assignments
    alive: AtomicBool,
    /// Request IDs that finished processing here
    completed: DashSet<String>,
    /// Capacity-1 gate serializing work on this backend
    execution_slot: Arc<Semaphore>,
    /// Work run for each request
    workload: Arc<dyn Workload>,
}

impl Backend {
    /// Create a new backend that sleeps for each request's processing time.
    ///
    /// Returns [`ConfigError::ZeroWeight`] when `weight` is zero.
    pub fn new(id: impl Into<BackendId>, weight: u32) -> Result<Self, ConfigError> {
        let id = id.into();
        let weight = NonZeroU32::new(weight).ok_or_else(|| ConfigError::ZeroWeight(id.clone()))?;

        Ok(Self {
            id,
            weight,
            alive: AtomicBool::new(true), // alive until an operator says otherwise
            completed: DashSet::new(),
            execution_slot: Arc::new(Semaphore::new(1)),
            workload: Arc::new(Sleep),
        })
    }

    /// Replace the work function run for each request.
    #[must_use]
    pub fn with_workload(mut self, workload: Arc<dyn Workload>) -> Self {
        self.workload = workload;
        self
    }

    /// The backend's identity.
    pub fn id(&self) -> &BackendId {
        &self.id
    }

    /// The backend's scheduling weight.
    pub fn weight(&self) -> u32 {
        self.weight.get()
    }

    /// Check if the backend is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the backend dead. Work already running is not interrupted.
    pub fn crash(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            tracing::warn!(backend = %self.id, "backend crashed");
        }
    }

    /// Mark the backend alive again.
    pub fn recover(&self) {
        if !self.alive.swap(true, Ordering::AcqRel) {
            tracing::info!(backend = %self.id, "backend recovered");
        }
    }

    /// Whether `request_id` has finished processing on this backend.
    pub fn is_processed(&self, request_id: &str) -> bool {
        self.completed.contains(request_id)
    }

    /// Number of distinct requests this backend has finished.
    pub fn processed_count(&self) -> usize {
        self.completed.len()
    }

    /// Whether the execution slot is currently held.
    pub fn is_busy(&self) -> bool {
        self.execution_slot.available_permits() == 0
    }

    /// Wait for the backend's execution slot.
    ///
    /// The slot is released when the returned guard is dropped.
    pub async fn acquire_slot(&self) -> Result<ExecutionSlot, RouteError> {
        let permit = self
            .execution_slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RouteError::Closed)?;
        Ok(ExecutionSlot { _permit: permit })
    }

    /// Run the workload for `request`, then record it as processed.
    ///
    /// Callers are expected to hold this backend's [`ExecutionSlot`]. A failed
    /// workload leaves the request unrecorded.
    pub async fn process(&self, request: &Request) -> Result<(), WorkError> {
        self.workload.run(request).await?;
        self.completed.insert(request.request_id.clone());
        tracing::trace!(backend = %self.id, request = %request.request_id, "request processed");
        Ok(())
    }
}

/// RAII guard for a backend's single execution slot.
#[derive(Debug)]
pub struct ExecutionSlot {
    _permit: OwnedSemaphorePermit,
}

/// A thread-safe reference to a Backend.
pub type SharedBackend = Arc<Backend>;
