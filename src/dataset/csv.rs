//! CSV sink and source for patient records
//!
//! List fields are written as JSON arrays of strings. The reader accepts
//! list fields written either as JSON arrays or as Python list literals
//! (`['Sốt', 'Ho']`).

use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};

use crate::algorithm::statistics::DiseaseDistribution;
use crate::error::util::{safe_create_file, safe_read_to_string};
use crate::error::{Result, SynthError};
use crate::models::{PatientRecord, Season};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Write `records` as CSV to `path`, creating parent directories
pub fn write_records_csv(path: &Path, records: &[PatientRecord]) -> Result<()> {
    log_operation_start("Writing records to", path);
    let start = Instant::now();
    let file = safe_create_file(path, "record dataset")?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)?;
    writer
        .flush()
        .map_err(|e| SynthError::io_with_path(e, path))?;
    log_operation_complete("wrote", path, records.len(), Some(start.elapsed()));
    Ok(())
}

/// Write `records` as CSV (header included) to any writer
pub fn write_records<W: Write>(writer: &mut W, records: &[PatientRecord]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(PatientRecord::COLUMNS)?;
    for record in records {
        let age = record.age.to_string();
        let visit_date = record.visit_date.format("%Y-%m-%d").to_string();
        let symptoms = serde_json::to_string(&record.symptoms)?;
        let risk_factors = serde_json::to_string(&record.risk_factors)?;
        csv_writer.write_record([
            record.gender.as_str(),
            &age,
            &record.location,
            &visit_date,
            record.season.label(),
            &record.disease,
            &symptoms,
            &risk_factors,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the distribution report as `disease,count,percentage`
pub fn write_distribution_csv(path: &Path, distribution: &DiseaseDistribution) -> Result<()> {
    let file = safe_create_file(path, "disease distribution report")?;
    let mut writer = WriterBuilder::new().from_writer(BufWriter::new(file));
    writer.write_record(["disease", "count", "percentage"])?;
    for row in &distribution.rows {
        writer.write_record([
            row.disease.clone(),
            row.count.to_string(),
            format!("{:.2}", row.percentage),
        ])?;
    }
    writer
        .flush()
        .map_err(|e| SynthError::io_with_path(e, path))?;
    log_operation_complete("wrote", path, distribution.rows.len(), None);
    Ok(())
}

/// Read a record CSV written by [`write_records_csv`] or by the original tooling
pub fn read_records_csv(path: &Path) -> Result<Vec<PatientRecord>> {
    log_operation_start("Reading records from", path);
    let start = Instant::now();
    let content = safe_read_to_string(path, "record dataset")?;
    let records = parse_records(&content)?;
    log_operation_complete("read", path, records.len(), Some(start.elapsed()));
    Ok(records)
}

/// Parse CSV text into records.
///
/// Columns are located by header name, so their order does not matter and
/// extra columns are ignored. An empty season field is derived from the date.
pub fn parse_records(content: &str) -> Result<Vec<PatientRecord>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let header = reader.headers().map_err(|e| read_error(&e, 1))?.clone();
    if header.is_empty() {
        return Ok(Vec::new());
    }

    let mut columns = [0usize; 8];
    for (slot, name) in columns.iter_mut().zip(PatientRecord::COLUMNS) {
        *slot = header
            .iter()
            .position(|column| column.trim().trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| SynthError::dataset_format(1, format!("missing column '{name}'")))?;
    }
    let [gender, age, location, visit_date, season, disease, symptoms, risk_factors] = columns;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        // Fallback line when the reader has no position: header plus rows so far
        let row = row.map_err(|e| read_error(&e, index + 2))?;
        let line = row
            .position()
            .map_or(index + 2, |position| position.line() as usize);
        let field = |column: usize| {
            row.get(column).ok_or_else(|| {
                SynthError::dataset_format(
                    line,
                    format!("expected at least {} fields, found {}", column + 1, row.len()),
                )
            })
        };

        let visit_date = parse_date(field(visit_date)?)
            .ok_or_else(|| SynthError::dataset_format(line, "invalid visit date"))?;
        let season = match field(season)?.trim() {
            "" => Season::of(visit_date),
            label => Season::from_label(label).ok_or_else(|| {
                SynthError::dataset_format(line, format!("unknown season '{label}'"))
            })?,
        };

        records.push(PatientRecord {
            gender: field(gender)?.to_string(),
            age: field(age)?
                .trim()
                .parse()
                .map_err(|e| SynthError::dataset_format(line, format!("invalid age: {e}")))?,
            location: field(location)?.to_string(),
            visit_date,
            season,
            disease: field(disease)?.to_string(),
            symptoms: parse_list_field(field(symptoms)?)
                .map_err(|message| SynthError::dataset_format(line, message))?,
            risk_factors: parse_list_field(field(risk_factors)?)
                .map_err(|message| SynthError::dataset_format(line, message))?,
        });
    }
    Ok(records)
}

/// Turn a reader error into a format error at the line the reader stopped on
fn read_error(error: &csv::Error, fallback_line: usize) -> SynthError {
    let line = error
        .position()
        .map_or(fallback_line, |position| position.line() as usize);
    SynthError::dataset_format(line, error.to_string())
}

/// Accept `YYYY-MM-DD`, optionally followed by a time of day
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Parse a list field written as a JSON array or as a Python list literal
pub fn parse_list_field(value: &str) -> std::result::Result<Vec<String>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }
    if !value.starts_with('[') || !value.ends_with(']') {
        return Err(format!("list field is not bracketed: {value}"));
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
        return Ok(items);
    }
    parse_python_list(&value[1..value.len() - 1])
}

/// Items of a Python list literal body: quoted strings separated by commas
fn parse_python_list(body: &str) -> std::result::Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(format!("expected a quoted list item, found '{quote}'"));
        }

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => item.push('\n'),
                    Some('t') => item.push('\t'),
                    Some(escaped) => item.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err("unterminated list item".to_string());
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(other) => return Err(format!("unexpected '{other}' between list items")),
        }
    }
    Ok(items)
}
