//! Global admission control.
//!
//! The gate is a counting semaphore sized to the router's admission limit. It
//! bounds how many requests may be past admission at once, no matter how the
//! scheduler spreads them across backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{ConfigError, RouteError};

/// Counting gate bounding the number of concurrently admitted requests.
#[derive(Debug)]
pub struct AdmissionGate {
    limit: usize,
    permits: Arc<Semaphore>,
    /// Requests currently holding a permit.
    admitted: Arc<AtomicUsize>,
    /// High-water mark of `admitted`.
    peak: Arc<AtomicUsize>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `limit` requests at a time.
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroAdmissionLimit);
        }
        if limit > Semaphore::MAX_PERMITS {
            return Err(ConfigError::AdmissionLimitTooLarge {
                limit,
                max: Semaphore::MAX_PERMITS,
            });
        }

        Ok(Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
            admitted: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Requests currently admitted.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    /// Highest number of requests ever admitted at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait for an admission permit.
    ///
    /// Fails with [`RouteError::Closed`] once the gate is closed, including for
    /// callers already waiting.
    pub async fn admit(&self) -> Result<AdmissionPermit, RouteError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RouteError::Closed)?;

        let now = self.admitted.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);

        Ok(AdmissionPermit {
            admitted: self.admitted.clone(),
            _permit: permit,
        })
    }

    /// Stop admitting requests. Outstanding permits stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

/// A RAII guard holding one admission slot.
///
/// The admitted count is decremented before the semaphore permit is returned,
/// so the count never exceeds the limit.
#[derive(Debug)]
pub struct AdmissionPermit {
    admitted: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::AcqRel);
    }
}
