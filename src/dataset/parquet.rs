//! Parquet sink and source for patient records
//!
//! Records are converted to one Arrow `RecordBatch` through `serde_arrow` and
//! written with `ArrowWriter`. Dates and seasons are stored as text so the
//! file reads the same way as the CSV export; list fields are `List<Utf8>`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::datatypes::{DataType, Field, FieldRef, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{Result, SynthError};
use crate::models::{PatientRecord, Season};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Flat row layout stored in Parquet files
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    gender: String,
    age: u32,
    location: String,
    visit_date: String,
    season: String,
    disease: String,
    symptoms: Vec<String>,
    risk_factors: Vec<String>,
}

impl From<&PatientRecord> for RecordRow {
    fn from(record: &PatientRecord) -> Self {
        Self {
            gender: record.gender.clone(),
            age: record.age,
            location: record.location.clone(),
            visit_date: record.visit_date.format("%Y-%m-%d").to_string(),
            season: record.season.label().to_string(),
            disease: record.disease.clone(),
            symptoms: record.symptoms.clone(),
            risk_factors: record.risk_factors.clone(),
        }
    }
}

impl RecordRow {
    fn into_record(self, row: usize) -> Result<PatientRecord> {
        let visit_date = NaiveDate::parse_from_str(&self.visit_date, "%Y-%m-%d").map_err(|e| {
            SynthError::dataset_format(row, format!("invalid visit date '{}': {e}", self.visit_date))
        })?;
        let season = Season::from_label(&self.season).ok_or_else(|| {
            SynthError::dataset_format(row, format!("unknown season '{}'", self.season))
        })?;
        Ok(PatientRecord {
            gender: self.gender,
            age: self.age,
            location: self.location,
            visit_date,
            season,
            disease: self.disease,
            symptoms: self.symptoms,
            risk_factors: self.risk_factors,
        })
    }
}

/// Arrow schema of the record table
#[must_use]
pub fn record_schema() -> ArrowSchema {
    let text_list = || DataType::List(Arc::new(Field::new("item", DataType::Utf8, false)));
    ArrowSchema::new(vec![
        Field::new("gender", DataType::Utf8, false),
        Field::new("age", DataType::UInt32, false),
        Field::new("location", DataType::Utf8, false),
        Field::new("visit_date", DataType::Utf8, false),
        Field::new("season", DataType::Utf8, false),
        Field::new("disease", DataType::Utf8, false),
        Field::new("symptoms", text_list(), false),
        Field::new("risk_factors", text_list(), false),
    ])
}

/// Convert records into a single record batch
pub fn records_to_batch(records: &[PatientRecord]) -> Result<RecordBatch> {
    let fields: Vec<FieldRef> = record_schema().fields().iter().map(Arc::clone).collect();
    let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Convert a record batch back into records
///
/// `first_row` offsets the row numbers reported in errors.
pub fn batch_to_records(batch: &RecordBatch, first_row: usize) -> Result<Vec<PatientRecord>> {
    let rows: Vec<RecordRow> = serde_arrow::from_record_batch(batch)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| row.into_record(first_row + i))
        .collect()
}

/// Write `records` to a Parquet file
pub fn write_records_parquet(path: &Path, records: &[PatientRecord]) -> Result<()> {
    log_operation_start("Writing parquet file", path);
    let start = Instant::now();
    let batch = records_to_batch(records)?;
    let file = safe_create_file(path, "parquet record dataset")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    log_operation_complete("wrote", path, records.len(), Some(start.elapsed()));
    Ok(())
}

/// Read every record of a Parquet file written by [`write_records_parquet`]
pub fn read_records_parquet(path: &Path) -> Result<Vec<PatientRecord>> {
    log_operation_start("Reading parquet file", path);
    let start = Instant::now();
    let file = safe_open_file(path, "parquet record dataset")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        records.extend(batch_to_records(&batch, records.len())?);
    }

    log_operation_complete("read", path, records.len(), Some(start.elapsed()));
    Ok(records)
}
