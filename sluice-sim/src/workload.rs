//! Synthetic request generation and result tallying.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sluice_core::{Request, RouteError, Router};
use tokio::task::JoinSet;

use crate::config::WorkloadConfig;

/// Outcome of one simulation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Requests processed per backend id
    pub served: BTreeMap<String, usize>,
    /// Requests rejected because nothing was alive
    pub unavailable: usize,
    /// Requests whose workload failed
    pub failed: usize,
    /// Requests refused after the router closed
    pub closed: usize,
}

impl Summary {
    /// Requests that were processed successfully.
    pub fn succeeded(&self) -> usize {
        self.served.values().sum()
    }
}

/// Build the request stream described by `config`.
///
/// Clients are assigned round robin, so with `clients >= requests` every
/// request comes from a distinct client.
pub fn generate(config: &WorkloadConfig) -> Vec<Request> {
    let clients = config.clients.max(1);
    let processing_time = Duration::from_millis(config.processing_ms);

    (0..config.requests)
        .map(|i| {
            Request::new(
                format!("client{}", i % clients),
                format!("request{i}"),
                processing_time,
            )
        })
        .collect()
}

/// Route every request concurrently and tally where each one ended up.
pub async fn run(router: Arc<Router>, requests: Vec<Request>) -> Summary {
    let mut tasks = JoinSet::new();
    for request in requests {
        let router = router.clone();
        tasks.spawn(async move { router.route(request).await });
    }

    let mut summary = Summary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(backend)) => *summary.served.entry(backend.0).or_default() += 1,
            Ok(Err(RouteError::NoAliveBackend)) => summary.unavailable += 1,
            Ok(Err(RouteError::Processing { .. })) => summary.failed += 1,
            Ok(Err(RouteError::Closed)) => summary.closed += 1,
            Err(e) => {
                tracing::error!(error = %e, "routing task panicked");
                summary.failed += 1;
            }
        }
    }
    summary
}
