//! Pluggable work functions executed by a backend.
//!
//! A backend does not know what "processing" means. It hands each request to a
//! [`Workload`], which by default just waits for the request's
//! `processing_time`. Tests swap in [`Immediate`] or their own instrumented
//! implementations.

use std::fmt;

use async_trait::async_trait;

use crate::domain::request::Request;
use crate::error::WorkError;

/// The work performed for each request routed to a backend.
#[async_trait]
pub trait Workload: Send + Sync + fmt::Debug {
    /// Run the work for `request`. Returning an error leaves the request unprocessed.
    async fn run(&self, request: &Request) -> Result<(), WorkError>;
}

/// Waits for the request's `processing_time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

#[async_trait]
impl Workload for Sleep {
    async fn run(&self, request: &Request) -> Result<(), WorkError> {
        tokio::time::sleep(request.processing_time).await;
        Ok(())
    }
}

/// Completes immediately, ignoring `processing_time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[async_trait]
impl Workload for Immediate {
    async fn run(&self, _request: &Request) -> Result<(), WorkError> {
        Ok(())
    }
}
