//! Persistence of generated datasets
//!
//! Records are written in bulk after generation, as CSV and optionally as
//! Parquet, and read back by the training pipeline.

use std::path::Path;

use crate::error::Result;
use crate::models::PatientRecord;

pub mod csv;
pub mod parquet;

pub use csv::{parse_records, read_records_csv, write_distribution_csv, write_records_csv};
pub use parquet::{read_records_parquet, records_to_batch, write_records_parquet};

/// Read records from a CSV or Parquet file, chosen by extension
pub fn read_records(path: &Path) -> Result<Vec<PatientRecord>> {
    if path.extension().is_some_and(|ext| ext == "parquet") {
        read_records_parquet(path)
    } else {
        read_records_csv(path)
    }
}
