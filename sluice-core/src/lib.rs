//! Sluice Core functionality.
//!
//! This crate contains the domain models, configuration definitions, and routing primitives
//! that power the Sluice request router: weighted backend selection, global admission
//! control, per-backend execution slots, and sticky client affinity.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sluice_core::{Backend, Request, Router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new(
//!     vec![
//!         Arc::new(Backend::new("alpha", 1)?),
//!         Arc::new(Backend::new("beta", 2)?),
//!     ],
//!     4,
//! )?;
//!
//! let served_by = router
//!     .route(Request::new("client-1", "req-1", Duration::from_millis(10)))
//!     .await?;
//! println!("served by {served_by}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod load_balancer;
pub mod router;

pub use config::{BackendConfig, RouterConfig};
pub use domain::backend::{Backend, BackendId, SharedBackend};
pub use domain::request::Request;
pub use domain::workload::{Immediate, Sleep, Workload};
pub use error::{ConfigError, RouteError, WorkError};
pub use router::{Router, RouterStats};
