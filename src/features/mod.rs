//! Feature encoding for the disease classifier
//!
//! A [`FeatureEncoder`] is fitted on a record dataset and turns records (and
//! prediction requests) into dense numeric rows:
//!
//! * `age` and `year` as plain numbers
//! * one-hot calendar month (`month_1`..`month_12`) and weekday
//!   (`weekday_0` is Monday)
//! * one-hot gender and location
//! * multi-label symptom and risk-factor indicators
//!
//! Labels are compared through their normalized keys. Symptom and risk-factor
//! labels are also passed through [`clean_symptom_text`] on both the training
//! and the serving side.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::PatientRecord;
use crate::schema::normalize_key;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthesis pattern is valid"));

/// Split free symptom text into lowercase tokens.
///
/// Text inside parentheses is removed before splitting on commas, so a comma
/// inside parentheses never produces an extra token, and a label whose only
/// distinguishing part is parenthesized loses it.
#[must_use]
pub fn clean_symptom_text(text: &str) -> Vec<String> {
    PARENTHESIZED
        .replace_all(text, "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Normalized feature keys of a list of labels
fn label_keys(labels: &[String]) -> impl Iterator<Item = String> + '_ {
    labels
        .iter()
        .flat_map(|label| clean_symptom_text(label))
        .map(|token| normalize_key(&token))
        .filter(|key| !key.is_empty())
}

/// Dense row-major feature matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    columns: usize,
    values: Vec<f32>,
}

impl FeatureMatrix {
    /// Build a matrix from equally long rows
    ///
    /// Returns `None` when the rows have different lengths.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != columns) {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            columns,
            values: rows.into_iter().flatten().collect(),
        })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        &self.values[index * self.columns..(index + 1) * self.columns]
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> f32 {
        self.values[row * self.columns + column]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(|i| self.row(i))
    }

    /// Copy of the given rows, in the given order
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.len(),
            columns: self.columns,
            values: indices
                .iter()
                .flat_map(|&i| self.row(i).iter().copied())
                .collect(),
        }
    }
}

/// Raw patient attributes, as found in a record or a prediction request
#[derive(Debug, Clone, Copy)]
pub struct PatientFeatures<'a> {
    pub gender: &'a str,
    pub age: f32,
    pub location: &'a str,
    pub visit_date: NaiveDate,
    pub symptoms: &'a [String],
    pub risk_factors: &'a [String],
}

impl<'a> From<&'a PatientRecord> for PatientFeatures<'a> {
    fn from(record: &'a PatientRecord) -> Self {
        Self {
            gender: &record.gender,
            age: record.age as f32,
            location: &record.location,
            visit_date: record.visit_date,
            symptoms: &record.symptoms,
            risk_factors: &record.risk_factors,
        }
    }
}

/// One encoded row with the input labels the encoder did not recognise
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub values: Vec<f32>,
    pub unknown_labels: Vec<String>,
}

/// Vocabulary-based encoder fitted on a dataset
#[derive(Debug, Clone, Serialize)]
pub struct FeatureEncoder {
    feature_names: Vec<String>,
    #[serde(skip)]
    index: FxHashMap<String, usize>,
}

impl FeatureEncoder {
    /// Fit the vocabularies on `records`
    #[must_use]
    pub fn fit(records: &[PatientRecord]) -> Self {
        let mut genders = BTreeSet::new();
        let mut locations = BTreeSet::new();
        let mut symptoms = BTreeSet::new();
        let mut risks = BTreeSet::new();
        for record in records {
            genders.insert(normalize_key(&record.gender));
            locations.insert(normalize_key(&record.location));
            symptoms.extend(label_keys(&record.symptoms));
            risks.extend(label_keys(&record.risk_factors));
        }

        let mut feature_names = vec!["age".to_string(), "year".to_string()];
        feature_names.extend((1..=12).map(|m| format!("month_{m}")));
        feature_names.extend((0..7).map(|d| format!("weekday_{d}")));
        let prefixed = [
            ("gender", genders),
            ("location", locations),
            ("symptom", symptoms),
            ("risk", risks),
        ];
        for (prefix, keys) in prefixed {
            feature_names.extend(
                keys.into_iter()
                    .filter(|key| !key.is_empty())
                    .map(|key| format!("{prefix}_{key}")),
            );
        }

        let index = feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        log::debug!("Feature encoder fitted with {} features", feature_names.len());
        Self {
            feature_names,
            index,
        }
    }

    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Symptom labels (normalized keys) known to the encoder
    pub fn known_symptoms(&self) -> impl Iterator<Item = &str> {
        self.feature_names
            .iter()
            .filter_map(|name| name.strip_prefix("symptom_"))
    }

    /// Encode one set of patient attributes
    #[must_use]
    pub fn encode(&self, patient: PatientFeatures<'_>) -> EncodedRow {
        let mut values = vec![0.0; self.feature_count()];
        let mut unknown_labels = Vec::new();

        values[0] = patient.age;
        values[1] = patient.visit_date.year() as f32;
        self.set(&mut values, &format!("month_{}", patient.visit_date.month()));
        self.set(
            &mut values,
            &format!("weekday_{}", patient.visit_date.weekday().num_days_from_monday()),
        );

        for (prefix, label) in [("gender", patient.gender), ("location", patient.location)] {
            if !self.set(&mut values, &format!("{prefix}_{}", normalize_key(label))) {
                unknown_labels.push(label.to_string());
            }
        }

        for (prefix, labels) in [("symptom", patient.symptoms), ("risk", patient.risk_factors)] {
            for label in labels {
                let keys: Vec<String> = label_keys(std::slice::from_ref(label)).collect();
                let known = keys
                    .iter()
                    .filter(|key| self.set(&mut values, &format!("{prefix}_{key}")))
                    .count();
                if known < keys.len() || keys.is_empty() {
                    unknown_labels.push(label.clone());
                }
            }
        }

        EncodedRow {
            values,
            unknown_labels,
        }
    }

    /// Encode a dataset, rows in record order
    #[must_use]
    pub fn encode_records(&self, records: &[PatientRecord]) -> FeatureMatrix {
        let values: Vec<f32> = records
            .par_iter()
            .flat_map_iter(|record| self.encode(record.into()).values)
            .collect();
        FeatureMatrix {
            rows: records.len(),
            columns: self.feature_count(),
            values,
        }
    }

    /// Set a one-hot column to 1, returning whether the column exists
    fn set(&self, values: &mut [f32], name: &str) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                values[i] = 1.0;
                true
            }
            None => false,
        }
    }
}

/// Bijection between disease keys and class indices, classes in sorted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    #[must_use]
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    #[must_use]
    pub fn decode(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }
}
