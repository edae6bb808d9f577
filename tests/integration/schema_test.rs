//! Loading and validating schema files

use health_synth::schema::DefectKind;
use health_synth::{RecordSampler, Schema, validate_schema};
use serde_json::json;

use crate::utils::{fixture_schema_with, generate_seeded, shipped_schema_path};

#[test]
fn test_shipped_schema_is_clean() {
    let schema = Schema::from_path(&shipped_schema_path()).unwrap();
    let report = validate_schema(&schema);
    assert!(report.is_clean(), "{report}");

    let sampler = RecordSampler::new(&schema);
    assert!(sampler.universe().len() > 10);
}

#[test]
fn test_shipped_schema_generates_full_dataset() {
    let schema = Schema::from_path(&shipped_schema_path()).unwrap();
    let outcome = generate_seeded(&schema, 1_000, 42);
    assert!(outcome.is_complete(), "{outcome}");
    assert!(outcome.records.iter().all(|r| schema.contains_disease(&r.disease)));
}

#[test]
fn test_defects_are_reported_without_aborting() {
    let schema = fixture_schema_with(|value| {
        value["symptoms"].as_object_mut().unwrap().remove("gout");
        value["weights"]["season_disease_multipliers"]["Hè-Thu"]["sot_xuat_huyet"] = json!(2.0);
        value["weights"]["categories"]["than_kinh"] = json!(0.1);
    });
    let report = validate_schema(&schema);
    assert!(report.has_errors());

    let missing = report.find(&DefectKind::MissingSymptoms).unwrap();
    assert_eq!(missing.keys, vec!["gout"]);
    assert!(report.find(&DefectKind::UnknownWeightedCategory).is_some());
    assert!(
        report
            .find(&DefectKind::UnknownSeasonDisease {
                season: "Hè-Thu".to_string()
            })
            .is_some()
    );

    // The generator still runs; gout records simply carry no symptoms
    let outcome = generate_seeded(&schema, 300, 1);
    assert!(outcome.is_complete());
    assert!(
        outcome
            .records
            .iter()
            .filter(|r| r.disease == "gout")
            .all(|r| r.symptoms.is_empty())
    );
}

#[test]
fn test_missing_schema_file_is_an_io_error() {
    let err = Schema::from_path(std::path::Path::new("does/not/exist.json")).unwrap_err();
    assert!(err.to_string().contains("does/not/exist.json"), "{err}");
}
