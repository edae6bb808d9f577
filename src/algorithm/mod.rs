//! Algorithm implementations for synthetic record generation
//!
//! This module contains the weighted choice primitive, the record sampler,
//! the bounded-retry generation driver and the distribution statistics of a
//! generated dataset.

pub mod generate;
pub mod sampler;
pub mod statistics;
pub mod weighted;

pub use generate::{GenerationOptions, GenerationOutcome, generate_records, generate_records_with};
pub use sampler::{DrawFailure, RecordSampler};
pub use statistics::{DiseaseDistribution, DiseaseFrequency, distribution_by_season};
pub use weighted::{choose_weighted_index, weighted_choice};
