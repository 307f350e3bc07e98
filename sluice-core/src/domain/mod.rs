//! Domain models: requests, backends, the work they run, and the routing table.

pub mod backend;
pub mod request;
pub mod routing;
pub mod workload;
