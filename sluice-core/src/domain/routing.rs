//! Routing module for backend membership and client affinity.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::domain::backend::{BackendId, SharedBackend};

/// How a backend was chosen for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The client's existing assignment was still valid.
    Sticky,
    /// The client had no assignment.
    Assigned,
    /// The previous assignment was dead or gone and has been replaced.
    Reassigned {
        /// Backend the client was bound to before
        from: BackendId,
    },
}

/// Backend membership plus the client affinity map.
///
/// The member list lives in an `ArcSwap` so readers take snapshots without
/// locking. Every mutation of the member list, and every read-or-write of the
/// affinity map, happens under the `affinity` lock, which keeps the two
/// consistent: an affinity entry never outlives its backend's membership.
#[derive(Debug)]
pub struct RoutingTable {
    backends: ArcSwap<Vec<SharedBackend>>,
    affinity: Mutex<HashMap<String, SharedBackend>>,
}

impl RoutingTable {
    /// Create a new routing table with the initial set of backends.
    ///
    /// Later duplicates of an id are dropped.
    pub fn new(initial_backends: Vec<SharedBackend>) -> Self {
        let mut members: Vec<SharedBackend> = Vec::with_capacity(initial_backends.len());
        for backend in initial_backends {
            if members.iter().any(|m| m.id() == backend.id()) {
                tracing::warn!(backend = %backend.id(), "ignoring duplicate backend");
                continue;
            }
            members.push(backend);
        }

        Self {
            backends: ArcSwap::from_pointee(members),
            affinity: Mutex::new(HashMap::new()),
        }
    }

    /// Retrieve a snapshot of all current backends in membership order.
    pub fn snapshot(&self) -> Arc<Vec<SharedBackend>> {
        self.backends.load_full()
    }

    /// Look up a registered backend by id.
    pub fn get(&self, id: &BackendId) -> Option<SharedBackend> {
        self.backends.load().iter().find(|b| b.id() == id).cloned()
    }

    /// Backend currently bound to `client_id`.
    pub fn affinity_of(&self, client_id: &str) -> Option<BackendId> {
        self.affinity.lock().get(client_id).map(|b| b.id().clone())
    }

    /// Number of clients with an affinity entry.
    pub fn affinity_len(&self) -> usize {
        self.affinity.lock().len()
    }

    /// Resolve the backend for `client_id`.
    ///
    /// Reuses the client's bound backend if it is alive and still a member.
    /// Otherwise calls `select` with the current members and binds the client
    /// to its choice. The whole check-then-set runs under the affinity lock.
    /// Returns `None` when `select` finds nothing.
    pub fn resolve<F>(&self, client_id: &str, select: F) -> Option<(SharedBackend, Resolution)>
    where
        F: FnOnce(&[SharedBackend]) -> Option<SharedBackend>,
    {
        let mut affinity = self.affinity.lock();
        let members = self.backends.load();

        let previous = match affinity.get(client_id) {
            Some(bound) if bound.is_alive() && members.iter().any(|m| m.id() == bound.id()) => {
                return Some((bound.clone(), Resolution::Sticky));
            }
            Some(bound) => Some(bound.id().clone()),
            None => None,
        };

        let chosen = select(&members)?;
        affinity.insert(client_id.to_owned(), chosen.clone());

        let resolution = match previous {
            Some(from) => Resolution::Reassigned { from },
            None => Resolution::Assigned,
        };
        Some((chosen, resolution))
    }

    /// Register `backend` unless a member with the same id exists.
    ///
    /// `on_insert` runs before the new member list is published.
    pub fn insert<F>(&self, backend: SharedBackend, on_insert: F) -> bool
    where
        F: FnOnce(&BackendId),
    {
        let _affinity = self.affinity.lock();
        let current = self.backends.load();
        if current.iter().any(|b| b.id() == backend.id()) {
            return false;
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(backend.clone());

        on_insert(backend.id());
        self.backends.store(Arc::new(next));
        true
    }

    /// Unregister the backend with `id` and purge every affinity entry bound to it.
    ///
    /// `on_remove` runs while the affinity lock is still held.
    pub fn remove<F>(&self, id: &BackendId, on_remove: F) -> Option<SharedBackend>
    where
        F: FnOnce(&BackendId),
    {
        let mut affinity = self.affinity.lock();
        let current = self.backends.load();
        let position = current.iter().position(|b| b.id() == id)?;

        let mut next: Vec<SharedBackend> = current.iter().cloned().collect();
        let removed = next.remove(position);
        self.backends.store(Arc::new(next));

        let before = affinity.len();
        affinity.retain(|_, bound| bound.id() != id);
        on_remove(id);

        tracing::debug!(
            backend = %id,
            purged_clients = before - affinity.len(),
            "purged affinity entries"
        );
        Some(removed)
    }
}

/// A shared reference to the routing table.
pub type SharedRoutingTable = Arc<RoutingTable>;
