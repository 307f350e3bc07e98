//! Smooth Weighted Round Robin selection.
//!
//! Each selection adds every alive backend's weight to its running
//! accumulator, picks the largest accumulator, and subtracts the total alive
//! weight from the winner. Over `Σw` consecutive picks on a stable set, each
//! backend is chosen exactly `w` times, interleaved rather than in bursts.

use std::collections::HashMap;

use crate::domain::backend::{BackendId, SharedBackend};

/// Per-router scheduler state: one running weight per registered backend.
#[derive(Debug, Default)]
pub struct SmoothWeighted {
    running: HashMap<BackendId, i64>,
}

impl SmoothWeighted {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) tracking `id` with a zero accumulator.
    pub fn track(&mut self, id: &BackendId) {
        self.running.insert(id.clone(), 0);
    }

    /// Stop tracking `id`.
    pub fn forget(&mut self, id: &BackendId) {
        self.running.remove(id);
    }

    /// Current accumulator for `id`, if tracked.
    pub fn running_weight(&self, id: &BackendId) -> Option<i64> {
        self.running.get(id).copied()
    }

    /// Select among the alive entries of `candidates`.
    ///
    /// Ties on the running weight go to the earliest candidate in slice order.
    /// Returns `None` when no candidate is alive.
    pub fn select(&mut self, candidates: &[SharedBackend]) -> Option<SharedBackend> {
        // Liveness can flip concurrently; read it once per selection.
        let alive: Vec<&SharedBackend> = candidates.iter().filter(|b| b.is_alive()).collect();
        let total: i64 = alive.iter().map(|b| i64::from(b.weight())).sum();

        let mut best: Option<(&SharedBackend, i64)> = None;
        for backend in alive {
            let running = self.running.entry(backend.id().clone()).or_insert(0);
            *running += i64::from(backend.weight());

            match best {
                Some((_, top)) if *running <= top => {}
                _ => best = Some((backend, *running)),
            }
        }

        let (chosen, _) = best?;
        if let Some(running) = self.running.get_mut(chosen.id()) {
            *running -= total;
        }
        Some(chosen.clone())
    }
}
