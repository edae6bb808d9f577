//! Domain models for generated patient records
//!
//! This module contains the record type produced by the sampler and consumed
//! by the dataset sinks, the distribution report and the feature encoder.

pub mod record;

// Re-export commonly used types
pub use record::{PatientRecord, Season};
