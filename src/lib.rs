//! Synthetic patient-record generation and disease prediction.
//!
//! A [`Schema`] describes the disease taxonomy together with its symptom,
//! risk-factor and weighting tables. [`RecordSampler`] draws patient records
//! from it through layered categorical weights, and [`generate_records`]
//! drives the sampler under a bounded attempt budget. Generated datasets are
//! written to CSV or Parquet, encoded into feature rows and used to train a
//! gradient-boosted classifier, which [`PredictionService`] serves as top-K
//! disease probabilities.

pub mod algorithm;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod models;
pub mod predict;
pub mod schema;
pub mod utils;

pub use algorithm::{
    DiseaseDistribution, DrawFailure, GenerationOptions, GenerationOutcome, RecordSampler,
    distribution_by_season, generate_records, generate_records_with, weighted_choice,
};
pub use config::{GeneratorConfig, TrainingConfig};
pub use error::{Result, SynthError};
pub use features::{FeatureEncoder, FeatureMatrix, LabelEncoder};
pub use model::{BoostingParams, DiseaseClassifier, GradientBoostedClassifier};
pub use models::{PatientRecord, Season};
pub use predict::{PredictionError, PredictionRequest, PredictionResponse, PredictionService};
pub use schema::{Schema, SchemaReport, validate_schema};
