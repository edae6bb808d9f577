//! Static generation schema: demographics, disease taxonomy and weight tables.
//!
//! The schema is loaded once, never mutated, and handed by reference to the
//! validator and the sampler. All maps are `BTreeMap`s so that iteration order
//! (and therefore a seeded generation run) is reproducible.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::error::util::safe_read_to_string;
use crate::utils::logging::{log_operation_complete, log_operation_start};

pub mod normalize;
pub mod validate;

pub use normalize::normalize_key;
pub use validate::{DefectKind, SchemaDefect, SchemaReport, Severity, validate_schema};

/// Inclusive integer age bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

/// Inclusive calendar bounds for visit dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Number of days covered, or `None` when `end` precedes `start`
    #[must_use]
    pub fn day_span(&self) -> Option<i64> {
        let span = (self.end - self.start).num_days();
        (span >= 0).then_some(span)
    }
}

/// The weighting layers composed into one distribution per draw
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightTables {
    /// Category key -> relative weight. Categories missing here are weighted 0.
    #[serde(default)]
    pub categories: BTreeMap<String, f64>,
    /// Region key -> relative population weight
    #[serde(default)]
    pub regions: BTreeMap<String, f64>,
    /// Region key -> category key -> multiplier (1.0 when absent)
    #[serde(default)]
    pub region_category_multipliers: BTreeMap<String, BTreeMap<String, f64>>,
    /// Season label -> disease key -> multiplier (1.0 when absent)
    #[serde(default)]
    pub season_disease_multipliers: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Complete description of the synthetic population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub genders: Vec<String>,
    pub age_range: AgeRange,
    /// Region key -> ordered list of locations
    pub regions: BTreeMap<String, Vec<String>>,
    /// Category key -> ordered list of disease keys
    pub disease_categories: BTreeMap<String, Vec<String>>,
    /// Disease key -> symptom labels
    #[serde(default)]
    pub symptoms: BTreeMap<String, Vec<String>>,
    /// Disease key -> risk-factor labels
    #[serde(default)]
    pub risk_factors: BTreeMap<String, Vec<String>>,
    pub date_range: DateRange,
    #[serde(default)]
    pub weights: WeightTables,
}

/// One disease of the universe together with the category it is drawn under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseEntry<'a> {
    pub disease: &'a str,
    pub category: &'a str,
}

impl Schema {
    /// Parse a schema from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        log_operation_start("Loading schema from", path);
        let start = std::time::Instant::now();
        let content = safe_read_to_string(path, "schema definition")?;
        let schema = Self::from_json_str(&content)?;
        log_operation_complete(
            "loaded",
            path,
            schema.disease_universe().len(),
            Some(start.elapsed()),
        );
        Ok(schema)
    }

    /// All distinct diseases, category by category in key order.
    ///
    /// A disease listed under several categories appears once, attached to the
    /// first category that lists it. Empty keys are skipped.
    #[must_use]
    pub fn disease_universe(&self) -> Vec<DiseaseEntry<'_>> {
        let mut seen = FxHashSet::default();
        let mut universe = Vec::new();
        for (category, diseases) in &self.disease_categories {
            for disease in diseases {
                if disease.is_empty() || !seen.insert(disease.as_str()) {
                    continue;
                }
                universe.push(DiseaseEntry {
                    disease: disease.as_str(),
                    category: category.as_str(),
                });
            }
        }
        universe
    }

    /// Whether `disease` is listed under any category
    #[must_use]
    pub fn contains_disease(&self, disease: &str) -> bool {
        self.disease_categories
            .values()
            .any(|diseases| diseases.iter().any(|d| d == disease))
    }

    /// Symptom labels for a disease; empty when the disease has none
    #[must_use]
    pub fn symptoms_of(&self, disease: &str) -> &[String] {
        self.symptoms.get(disease).map(Vec::as_slice).unwrap_or_default()
    }

    /// Risk-factor labels for a disease; empty when the disease has none
    #[must_use]
    pub fn risk_factors_of(&self, disease: &str) -> &[String] {
        self.risk_factors.get(disease).map(Vec::as_slice).unwrap_or_default()
    }
}
