//! Bounded-retry generation driver
//!
//! Calls the sampler until the requested number of records exists or the
//! attempt budget of `10 × N` draws is spent. Failed draws are counted per
//! reason and leave nothing behind.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use rand::Rng;

use crate::algorithm::sampler::{DrawFailure, RecordSampler};
use crate::models::PatientRecord;
use crate::schema::Schema;
use crate::utils::logging::{create_main_progress_bar, finish_and_clear, log_warning};

/// Draw attempts allowed per requested record
pub const ATTEMPTS_PER_RECORD: usize = 10;

/// Records produced by one generation run together with its accounting
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub records: Vec<PatientRecord>,
    pub requested: usize,
    /// Draws made, successes and failures alike
    pub attempts: usize,
    pub failures: BTreeMap<DrawFailure, usize>,
}

impl GenerationOutcome {
    #[must_use]
    pub fn produced(&self) -> usize {
        self.records.len()
    }

    /// Number of requested records that could not be produced
    #[must_use]
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.records.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }

    #[must_use]
    pub fn failed_attempts(&self) -> usize {
        self.failures.values().sum()
    }
}

impl fmt::Display for GenerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} records in {} attempts",
            self.produced(),
            self.requested,
            self.attempts
        )?;
        if !self.failures.is_empty() {
            let reasons: Vec<String> = self
                .failures
                .iter()
                .map(|(reason, count)| format!("{reason}: {count}"))
                .collect();
            write!(f, " (failed draws: {})", reasons.join(", "))?;
        }
        Ok(())
    }
}

/// Options for a generation run
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub show_progress: bool,
}

/// Generate `count` records from `schema` without a progress bar
pub fn generate_records<R: Rng + ?Sized>(
    schema: &Schema,
    count: usize,
    rng: &mut R,
) -> GenerationOutcome {
    generate_records_with(schema, count, GenerationOptions::default(), rng)
}

/// Generate `count` records from `schema`
///
/// Never fails: when the budget runs out the outcome holds fewer records than
/// requested and a warning is logged.
pub fn generate_records_with<R: Rng + ?Sized>(
    schema: &Schema,
    count: usize,
    options: GenerationOptions,
    rng: &mut R,
) -> GenerationOutcome {
    let start = Instant::now();
    let sampler = RecordSampler::new(schema);
    let budget = count.saturating_mul(ATTEMPTS_PER_RECORD);

    let pb = options
        .show_progress
        .then(|| create_main_progress_bar(count as u64, Some("Generating records")));

    let mut records = Vec::with_capacity(count);
    let mut failures = BTreeMap::new();
    let mut attempts = 0;

    while records.len() < count && attempts < budget {
        attempts += 1;
        match sampler.draw(rng) {
            Ok(record) => {
                records.push(record);
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }
            Err(reason) => {
                *failures.entry(reason).or_insert(0) += 1;
                log::trace!("Draw {attempts} discarded: {reason}");
            }
        }
    }

    if let Some(pb) = &pb {
        finish_and_clear(pb);
    }

    let outcome = GenerationOutcome {
        records,
        requested: count,
        attempts,
        failures,
    };

    if outcome.is_complete() {
        log::info!("Generated {outcome} in {:?}", start.elapsed());
    } else {
        log_warning(
            &format!(
                "Attempt budget of {budget} exhausted, generated {outcome}; {} records short",
                outcome.shortfall()
            ),
            None,
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn schema(genders: &str) -> Schema {
        Schema::from_json_str(&format!(
            r#"{{
                "genders": {genders},
                "age_range": {{"min": 18, "max": 65}},
                "regions": {{"mien_trung": ["Huế", "Đà Nẵng"]}},
                "disease_categories": {{"tieu_hoa": ["viem_da_day", "tieu_chay"]}},
                "symptoms": {{"viem_da_day": ["Đau thượng vị", "Buồn nôn"], "tieu_chay": ["Đi ngoài"]}},
                "risk_factors": {{"viem_da_day": ["Stress"], "tieu_chay": ["Thức ăn bẩn", "Nước bẩn"]}},
                "date_range": {{"start": "2023-06-01", "end": "2023-08-31"}},
                "weights": {{
                    "categories": {{"tieu_hoa": 1.0}},
                    "regions": {{"mien_trung": 1.0}}
                }}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_generates_requested_count() {
        let schema = schema(r#"["Nam", "Nữ"]"#);
        let mut rng = StdRng::seed_from_u64(42);
        let outcome = generate_records(&schema, 100, &mut rng);
        assert_eq!(outcome.produced(), 100);
        assert_eq!(outcome.attempts, 100);
        assert!(outcome.is_complete());
        assert_eq!(outcome.failed_attempts(), 0);
    }

    #[test]
    fn test_budget_exhaustion_reports_shortfall() {
        let schema = schema("[]");
        let mut rng = StdRng::seed_from_u64(42);
        let outcome = generate_records(&schema, 7, &mut rng);
        assert_eq!(outcome.produced(), 0);
        assert_eq!(outcome.attempts, 70);
        assert_eq!(outcome.shortfall(), 7);
        assert_eq!(outcome.failures.get(&DrawFailure::NoGender), Some(&70));
        assert!(outcome.to_string().contains("0/7 records in 70 attempts"));
    }

    #[test]
    fn test_zero_records_requested() {
        let schema = schema(r#"["Nam"]"#);
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = generate_records(&schema, 0, &mut rng);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let schema = schema(r#"["Nam", "Nữ"]"#);
        let first = generate_records(&schema, 50, &mut StdRng::seed_from_u64(8));
        let second = generate_records(&schema, 50, &mut StdRng::seed_from_u64(8));
        assert_eq!(first.records, second.records);
    }
}
