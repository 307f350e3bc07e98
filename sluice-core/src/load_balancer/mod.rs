//! Load balancing primitives: weighted selection and admission control.

pub mod admission;
pub mod smooth_weighted;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use smooth_weighted::SmoothWeighted;
