//! Generation driver and sampler behaviour over whole datasets

use std::collections::BTreeSet;

use health_synth::algorithm::sampler::{MAX_RISK_FACTORS, MAX_SYMPTOMS};
use health_synth::{DiseaseDistribution, DrawFailure, Season, distribution_by_season};
use serde_json::json;

use crate::utils::{fixture_schema, fixture_schema_with, generate_seeded};

#[test]
fn test_records_respect_referential_integrity() {
    let schema = fixture_schema();
    let outcome = generate_seeded(&schema, 2_000, 11);
    assert!(outcome.is_complete());
    assert_eq!(outcome.produced(), 2_000);
    assert_eq!(outcome.attempts, 2_000);

    let locations: BTreeSet<&str> = schema.regions.values().flatten().map(String::as_str).collect();
    for record in &outcome.records {
        assert!(schema.genders.contains(&record.gender));
        assert!((schema.age_range.min..=schema.age_range.max).contains(&record.age));
        assert!(locations.contains(record.location.as_str()));
        assert!(record.visit_date >= schema.date_range.start);
        assert!(record.visit_date <= schema.date_range.end);
        assert_eq!(record.season, Season::of(record.visit_date));
        assert!(schema.contains_disease(&record.disease));

        let symptoms = schema.symptoms_of(&record.disease);
        assert!(!record.symptoms.is_empty());
        assert!(record.symptoms.len() <= MAX_SYMPTOMS.min(symptoms.len()));
        assert!(record.symptoms.iter().all(|s| symptoms.contains(s)));
        let distinct: BTreeSet<&String> = record.symptoms.iter().collect();
        assert_eq!(distinct.len(), record.symptoms.len());

        let risks = schema.risk_factors_of(&record.disease);
        assert!(!record.risk_factors.is_empty());
        assert!(record.risk_factors.len() <= MAX_RISK_FACTORS.min(risks.len()));
        assert!(record.risk_factors.iter().all(|r| risks.contains(r)));
    }
}

#[test]
fn test_same_seed_same_dataset() {
    let schema = fixture_schema();
    let first = generate_seeded(&schema, 300, 5);
    let second = generate_seeded(&schema, 300, 5);
    assert_eq!(first.records, second.records);

    let other = generate_seeded(&schema, 300, 6);
    assert_ne!(first.records, other.records);
}

#[test]
fn test_budget_exhaustion_reports_shortfall() {
    let schema = fixture_schema_with(|value| value["genders"] = json!([]));
    let outcome = generate_seeded(&schema, 25, 1);
    assert_eq!(outcome.produced(), 0);
    assert_eq!(outcome.attempts, 250);
    assert_eq!(outcome.shortfall(), 25);
    assert_eq!(outcome.failures.get(&DrawFailure::NoGender), Some(&250));
    assert!(outcome.to_string().contains("0/25 records in 250 attempts"));
}

#[test]
fn test_unweighted_category_is_never_drawn() {
    let schema = fixture_schema_with(|value| {
        value["weights"]["categories"]
            .as_object_mut()
            .unwrap()
            .remove("xuong_khop");
    });
    let outcome = generate_seeded(&schema, 1_000, 3);
    assert!(outcome.is_complete());
    assert!(outcome.records.iter().all(|r| r.disease != "gout"));
}

#[test]
fn test_zero_seasonal_multiplier_removes_disease_from_season() {
    let schema = fixture_schema_with(|value| {
        value["date_range"] = json!({"start": "2024-01-01", "end": "2024-03-31"});
        value["weights"]["season_disease_multipliers"]["Đông-Xuân"]["cum"] = json!(0.0);
    });
    let outcome = generate_seeded(&schema, 1_000, 8);
    assert!(outcome.is_complete());
    assert!(outcome.records.iter().all(|r| r.season == Season::WinterSpring));
    assert!(outcome.records.iter().all(|r| r.disease != "cum"));
}

#[test]
fn test_all_zero_weights_fall_back_to_uniform() {
    let schema = fixture_schema_with(|value| {
        value["weights"]["categories"] = json!({});
    });
    let outcome = generate_seeded(&schema, 2_500, 21);
    assert!(outcome.is_complete());

    let distribution = DiseaseDistribution::from_records(&outcome.records);
    assert_eq!(distribution.rows.len(), 5);
    // Uniform over five diseases: each near 20%
    for row in &distribution.rows {
        assert!((row.percentage - 20.0).abs() < 4.0, "{}: {}", row.disease, row.percentage);
    }
}

#[test]
fn test_missing_region_weights_still_complete_dataset() {
    let schema = fixture_schema_with(|value| {
        value["weights"]["regions"] = json!({});
    });
    let outcome = generate_seeded(&schema, 1_500, 17);
    assert!(outcome.is_complete(), "{outcome}");
    assert!(!outcome.failures.contains_key(&DrawFailure::NoRegion));

    let drawn_regions: BTreeSet<&str> = outcome
        .records
        .iter()
        .filter_map(|record| {
            schema
                .regions
                .iter()
                .find(|(_, locations)| locations.contains(&record.location))
                .map(|(region, _)| region.as_str())
        })
        .collect();
    assert_eq!(drawn_regions.len(), schema.regions.len());
}

#[test]
fn test_distribution_by_season_partitions_dataset() {
    let schema = fixture_schema();
    let outcome = generate_seeded(&schema, 1_200, 2);
    let by_season = distribution_by_season(&outcome.records);
    assert_eq!(by_season.len(), 4);
    let total: usize = by_season.values().map(|d| d.total).sum();
    assert_eq!(total, 1_200);
}
