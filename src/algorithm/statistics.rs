//! Disease distribution of a generated dataset
//!
//! Counts records per disease and expresses each count as a percentage of the
//! dataset, most frequent disease first.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::{PatientRecord, Season};

/// One row of the distribution report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseFrequency {
    pub disease: String,
    pub count: usize,
    /// Share of all records, rounded to two decimals
    pub percentage: f64,
}

/// Disease frequencies sorted by count, descending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiseaseDistribution {
    pub total: usize,
    pub rows: Vec<DiseaseFrequency>,
}

impl DiseaseDistribution {
    /// Build the distribution of `records`
    ///
    /// Ties in count are ordered by disease key so the report is stable.
    #[must_use]
    pub fn from_records<'r>(records: impl IntoIterator<Item = &'r PatientRecord>) -> Self {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        let mut total = 0;
        for record in records {
            *counts.entry(record.disease.as_str()).or_insert(0) += 1;
            total += 1;
        }

        let rows = counts
            .into_iter()
            .sorted_by(|(a_key, a_count), (b_key, b_count)| {
                b_count.cmp(a_count).then_with(|| a_key.cmp(b_key))
            })
            .map(|(disease, count)| DiseaseFrequency {
                disease: disease.to_string(),
                count,
                percentage: percentage(count, total),
            })
            .collect();

        Self { total, rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `n` most frequent diseases
    #[must_use]
    pub fn most_common(&self, n: usize) -> &[DiseaseFrequency] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// The `n` least frequent diseases, rarest last
    #[must_use]
    pub fn least_common(&self, n: usize) -> &[DiseaseFrequency] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    #[must_use]
    pub fn get(&self, disease: &str) -> Option<&DiseaseFrequency> {
        self.rows.iter().find(|row| row.disease == disease)
    }
}

impl fmt::Display for DiseaseDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Disease distribution over {} records:", self.total)?;
        for row in &self.rows {
            writeln!(
                f,
                "  {:<32} {:>8} {:>7.2}%",
                row.disease, row.count, row.percentage
            )?;
        }
        Ok(())
    }
}

/// Disease distribution of each season present in `records`
#[must_use]
pub fn distribution_by_season(records: &[PatientRecord]) -> BTreeMap<Season, DiseaseDistribution> {
    records
        .iter()
        .into_group_map_by(|record| record.season)
        .into_iter()
        .map(|(season, group)| (season, DiseaseDistribution::from_records(group)))
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(disease: &str, month: u32) -> PatientRecord {
        let visit_date = NaiveDate::from_ymd_opt(2023, month, 15).unwrap();
        PatientRecord {
            gender: "Nam".to_string(),
            age: 40,
            location: "Hà Nội".to_string(),
            visit_date,
            season: Season::of(visit_date),
            disease: disease.to_string(),
            symptoms: vec!["Ho".to_string()],
            risk_factors: vec!["Hút thuốc".to_string()],
        }
    }

    #[test]
    fn test_distribution_sorted_by_count() {
        let records = vec![
            record("cum", 1),
            record("gout", 2),
            record("cum", 3),
            record("viem_phoi", 4),
            record("cum", 5),
            record("gout", 6),
        ];
        let distribution = DiseaseDistribution::from_records(&records);
        assert_eq!(distribution.total, 6);

        let keys: Vec<_> = distribution.rows.iter().map(|r| r.disease.as_str()).collect();
        assert_eq!(keys, vec!["cum", "gout", "viem_phoi"]);
        assert_eq!(distribution.rows[0].count, 3);
        assert!((distribution.rows[0].percentage - 50.0).abs() < f64::EPSILON);
        assert!((distribution.rows[1].percentage - 33.33).abs() < 1e-9);
        assert!((distribution.rows[2].percentage - 16.67).abs() < 1e-9);

        assert_eq!(distribution.most_common(1)[0].disease, "cum");
        assert_eq!(distribution.least_common(1)[0].disease, "viem_phoi");
        assert_eq!(distribution.most_common(10).len(), 3);
        assert_eq!(distribution.get("gout").map(|r| r.count), Some(2));
    }

    #[test]
    fn test_empty_distribution() {
        let distribution = DiseaseDistribution::from_records(&[]);
        assert!(distribution.is_empty());
        assert_eq!(distribution.total, 0);
        assert!(distribution.least_common(5).is_empty());
    }

    #[test]
    fn test_distribution_by_season() {
        let records = vec![record("cum", 1), record("cum", 2), record("gout", 8)];
        let by_season = distribution_by_season(&records);
        assert_eq!(by_season.len(), 2);
        assert_eq!(by_season[&Season::WinterSpring].total, 2);
        assert_eq!(by_season[&Season::SummerAutumn].rows[0].disease, "gout");
        assert!(!by_season.contains_key(&Season::AutumnWinter));
    }
}
