//! Request router.
//!
//! ```text
//! route(request)
//!   -> affinity lookup / SWRR selection   (routing table lock, then scheduler lock)
//!   -> admission permit                   (global semaphore)
//!   -> execution slot                     (backend semaphore, capacity 1)
//!   -> Backend::process
//!   <- slot released, then admission released
//! ```
//!
//! Membership and affinity share one lock; the SWRR accumulator has its own.
//! Neither lock is held across an await point.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::RouterConfig;
use crate::domain::backend::{Backend, BackendId, SharedBackend};
use crate::domain::request::Request;
use crate::domain::routing::{Resolution, RoutingTable};
use crate::error::{ConfigError, RouteError};
use crate::load_balancer::{AdmissionGate, SmoothWeighted};

/// Point-in-time view of a router's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterStats {
    /// Registered backends
    pub members: usize,
    /// Registered backends that are alive
    pub alive: usize,
    /// Requests currently past admission
    pub admitted: usize,
    /// Highest concurrent admissions observed
    pub peak_admitted: usize,
    /// Configured admission limit
    pub admission_limit: usize,
    /// Clients with an affinity entry
    pub affinity_entries: usize,
}

/// Routes requests to backends with weighted selection, admission control,
/// and client affinity.
#[derive(Debug)]
pub struct Router {
    table: RoutingTable,
    scheduler: Mutex<SmoothWeighted>,
    admission: AdmissionGate,
}

impl Router {
    /// Create a router over `backends` admitting at most `admission_limit`
    /// concurrent requests.
    pub fn new(
        backends: impl IntoIterator<Item = SharedBackend>,
        admission_limit: usize,
    ) -> Result<Self, ConfigError> {
        let admission = AdmissionGate::new(admission_limit)?;
        let table = RoutingTable::new(backends.into_iter().collect());

        let mut scheduler = SmoothWeighted::new();
        for backend in table.snapshot().iter() {
            scheduler.track(backend.id());
        }

        tracing::info!(
            backends = table.snapshot().len(),
            admission_limit,
            "router created"
        );

        Ok(Self {
            table,
            scheduler: Mutex::new(scheduler),
            admission,
        })
    }

    /// Build a router from configuration. Backends use the default sleeping workload.
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let backends = config
            .backends
            .iter()
            .map(|b| Backend::new(b.id.as_str(), b.weight).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends, config.admission_limit)
    }

    /// Route `request` to a backend and wait for it to be processed.
    ///
    /// Returns the id of the backend that processed the request.
    pub async fn route(&self, request: Request) -> Result<BackendId, RouteError> {
        let backend = self.pick(&request.client_id)?;

        // Dropped in reverse order: execution slot first, then admission.
        let _admission = self.admission.admit().await?;
        let _slot = backend.acquire_slot().await?;

        if let Err(source) = backend.process(&request).await {
            tracing::warn!(
                backend = %backend.id(),
                request = %request.request_id,
                error = %source,
                "request processing failed"
            );
            return Err(RouteError::Processing {
                backend: backend.id().clone(),
                source,
            });
        }

        Ok(backend.id().clone())
    }

    fn pick(&self, client_id: &str) -> Result<SharedBackend, RouteError> {
        let (backend, resolution) = self
            .table
            .resolve(client_id, |members| self.scheduler.lock().select(members))
            .ok_or(RouteError::NoAliveBackend)?;

        match resolution {
            Resolution::Sticky => {
                tracing::trace!(client = client_id, backend = %backend.id(), "affinity hit");
            }
            Resolution::Assigned => {
                tracing::debug!(client = client_id, backend = %backend.id(), "client assigned");
            }
            Resolution::Reassigned { from } => {
                tracing::debug!(
                    client = client_id,
                    from = %from,
                    backend = %backend.id(),
                    "client reassigned"
                );
            }
        }
        Ok(backend)
    }

    /// Register a backend. Returns `false` if one with the same id is already a member.
    pub fn add_server(&self, backend: SharedBackend) -> bool {
        let id = backend.id().clone();
        let added = self
            .table
            .insert(backend, |id| self.scheduler.lock().track(id));

        if added {
            tracing::info!(backend = %id, "backend added");
        }
        added
    }

    /// Unregister a backend, dropping every client affinity bound to it.
    ///
    /// Requests already dispatched to it run to completion.
    pub fn remove_server(&self, id: &BackendId) -> Option<SharedBackend> {
        let removed = self
            .table
            .remove(id, |id| self.scheduler.lock().forget(id));

        if removed.is_some() {
            tracing::info!(backend = %id, "backend removed");
        }
        removed
    }

    /// Snapshot of the registered backends in membership order.
    pub fn servers(&self) -> Arc<Vec<SharedBackend>> {
        self.table.snapshot()
    }

    /// Look up a registered backend.
    pub fn server(&self, id: &BackendId) -> Option<SharedBackend> {
        self.table.get(id)
    }

    /// Maximum number of concurrently admitted requests.
    pub fn admission_limit(&self) -> usize {
        self.admission.limit()
    }

    /// Backend currently bound to `client_id`.
    pub fn affinity_of(&self, client_id: &str) -> Option<BackendId> {
        self.table.affinity_of(client_id)
    }

    /// Current SWRR accumulator for a backend.
    pub fn running_weight(&self, id: &BackendId) -> Option<i64> {
        self.scheduler.lock().running_weight(id)
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> RouterStats {
        let members = self.table.snapshot();
        RouterStats {
            members: members.len(),
            alive: members.iter().filter(|b| b.is_alive()).count(),
            admitted: self.admission.admitted(),
            peak_admitted: self.admission.peak(),
            admission_limit: self.admission.limit(),
            affinity_entries: self.table.affinity_len(),
        }
    }

    /// Stop admitting requests. Requests already admitted finish normally;
    /// new and waiting ones fail with [`RouteError::Closed`].
    pub fn close(&self) {
        self.admission.close();
        tracing::info!("router closed");
    }

    /// Whether the router has been closed.
    pub fn is_closed(&self) -> bool {
        self.admission.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::domain::workload::Immediate;
    use std::time::Duration;

    fn instant(id: &str, weight: u32) -> SharedBackend {
        Arc::new(
            Backend::new(id, weight)
                .unwrap()
                .with_workload(Arc::new(Immediate)),
        )
    }

    fn request(client: &str, id: &str) -> Request {
        Request::new(client, id, Duration::from_millis(10))
    }

    #[test]
    fn new_rejects_zero_admission_limit() {
        assert!(matches!(
            Router::new(vec![instant("a", 1)], 0),
            Err(ConfigError::ZeroAdmissionLimit)
        ));
    }

    #[test]
    fn from_config_builds_members_in_order() {
        let config = RouterConfig {
            admission_limit: 3,
            backends: vec![
                BackendConfig::new("x", 2),
                BackendConfig::new("y", 1),
            ],
        };

        let router = Router::from_config(&config).unwrap();
        let ids: Vec<_> = router.servers().iter().map(|b| b.id().0.clone()).collect();

        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(router.admission_limit(), 3);
        assert_eq!(router.server(&BackendId::from("x")).unwrap().weight(), 2);
    }

    #[tokio::test]
    async fn basic_routing_marks_request_processed() {
        let router = Router::new(vec![instant("a", 1), instant("b", 1)], 5).unwrap();

        let served = router.route(request("client1", "request1")).await.unwrap();

        assert!(router.server(&served).unwrap().is_processed("request1"));
        assert_eq!(router.affinity_of("client1"), Some(served));
    }

    #[tokio::test]
    async fn no_alive_backend_is_reported() {
        let router = Router::new(vec![instant("a", 1)], 5).unwrap();
        router.servers()[0].crash();

        let err = router.route(request("c", "r")).await.unwrap_err();

        assert!(matches!(err, RouteError::NoAliveBackend));
        assert_eq!(router.affinity_of("c"), None);
        assert_eq!(router.stats().admitted, 0);
    }

    #[tokio::test]
    async fn empty_router_reports_no_alive_backend() {
        let router = Router::new(Vec::new(), 1).unwrap();
        assert!(matches!(
            router.route(request("c", "r")).await,
            Err(RouteError::NoAliveBackend)
        ));
    }

    #[tokio::test]
    async fn add_and_remove_server() {
        let router = Router::new(vec![instant("a", 1)], 5).unwrap();

        assert!(router.add_server(instant("new", 3)));
        assert!(!router.add_server(instant("new", 3)));
        assert_eq!(router.servers().len(), 2);
        assert_eq!(router.running_weight(&BackendId::from("new")), Some(0));

        let removed = router.remove_server(&BackendId::from("a")).unwrap();
        assert_eq!(removed.id().0, "a");
        assert!(router.server(&BackendId::from("a")).is_none());
        assert_eq!(router.running_weight(&BackendId::from("a")), None);
        assert!(router.remove_server(&BackendId::from("a")).is_none());
    }

    #[tokio::test]
    async fn closed_router_rejects_requests() {
        let router = Router::new(vec![instant("a", 1)], 5).unwrap();
        router.close();

        assert!(router.is_closed());
        assert!(matches!(
            router.route(request("c", "r")).await,
            Err(RouteError::Closed)
        ));
        assert!(!router.servers()[0].is_processed("r"));
    }

    #[tokio::test]
    async fn stats_reflect_membership_and_affinity() {
        let router = Router::new(vec![instant("a", 1), instant("b", 1)], 4).unwrap();
        router.route(request("c1", "r1")).await.unwrap();
        router.route(request("c2", "r2")).await.unwrap();
        router.servers()[1].crash();

        let stats = router.stats();
        assert_eq!(
            stats,
            RouterStats {
                members: 2,
                alive: 1,
                admitted: 0,
                peak_admitted: 1,
                admission_limit: 4,
                affinity_entries: 2,
            }
        );
    }
}
