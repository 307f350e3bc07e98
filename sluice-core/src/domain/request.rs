//! Request value type.

use std::time::Duration;

/// A unit of work submitted to the router.
///
/// `client_id` drives affinity, `request_id` is the key recorded by the backend
/// once processing finishes, and `processing_time` is how long the default
/// workload holds the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    /// Identity of the calling client
    pub client_id: String,
    /// Unique key of this request
    pub request_id: String,
    /// Simulated processing duration
    pub processing_time: Duration,
}

impl Request {
    /// Create a new request.
    pub fn new(
        client_id: impl Into<String>,
        request_id: impl Into<String>,
        processing_time: Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            request_id: request_id.into(),
            processing_time,
        }
    }
}
