//! Training on generated data and serving predictions

use health_synth::model::train_test_split;
use health_synth::{
    BoostingParams, FeatureEncoder, GradientBoostedClassifier, LabelEncoder, PatientRecord,
    PredictionRequest, PredictionService,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::utils::{fixture_schema, generate_seeded};

fn trained_service(records: &[PatientRecord]) -> PredictionService<GradientBoostedClassifier> {
    let encoder = FeatureEncoder::fit(records);
    let labels = LabelEncoder::fit(records.iter().map(|r| r.disease.as_str()));
    let features = encoder.encode_records(records);
    let targets: Vec<usize> = records
        .iter()
        .map(|r| labels.encode(&r.disease).unwrap())
        .collect();
    let params = BoostingParams {
        rounds: 15,
        ..BoostingParams::default()
    };
    let model =
        GradientBoostedClassifier::fit(&features, &targets, labels.class_count(), &params).unwrap();
    PredictionService::new(encoder, labels, model)
}

fn request_for(record: &PatientRecord, top_k: usize) -> PredictionRequest {
    PredictionRequest {
        gender: record.gender.clone(),
        age: record.age,
        location: record.location.clone(),
        visit_date: record.visit_date.to_string(),
        symptoms: record.symptoms.clone(),
        risk_factors: record.risk_factors.clone(),
        top_k,
    }
}

#[test]
fn test_classifier_separates_symptom_profiles() {
    let records = generate_seeded(&fixture_schema(), 800, 17).records;
    let encoder = FeatureEncoder::fit(&records);
    let labels = LabelEncoder::fit(records.iter().map(|r| r.disease.as_str()));
    let features = encoder.encode_records(&records);
    let targets: Vec<usize> = records
        .iter()
        .map(|r| labels.encode(&r.disease).unwrap())
        .collect();

    let mut rng = StdRng::seed_from_u64(42);
    let (train, test) = train_test_split(records.len(), 0.25, &mut rng);
    let pick = |indices: &[usize]| indices.iter().map(|&i| targets[i]).collect::<Vec<_>>();
    let params = BoostingParams {
        rounds: 15,
        ..BoostingParams::default()
    };
    let model = GradientBoostedClassifier::fit(
        &features.select(&train),
        &pick(&train),
        labels.class_count(),
        &params,
    )
    .unwrap();

    // Symptom sets are disjoint between diseases
    let accuracy = model.accuracy(&features.select(&test), &pick(&test));
    assert!(accuracy > 0.9, "test accuracy {accuracy}");
}

#[test]
fn test_service_returns_ranked_top_k() {
    let records = generate_seeded(&fixture_schema(), 600, 23).records;
    let service = trained_service(&records);

    let record = &records[0];
    let response = service.predict(&request_for(record, 3)).unwrap();
    assert_eq!(response.effective_top_k, 3);
    assert_eq!(response.top_predictions.len(), 3);
    assert_eq!(response.top_predictions[0].disease, record.disease);
    assert!(
        response
            .top_predictions
            .windows(2)
            .all(|w| w[0].probability_percentage >= w[1].probability_percentage)
    );
    assert!(response.unknown_labels.is_empty());

    let all = service.predict(&request_for(record, 50)).unwrap();
    assert_eq!(all.requested_top_k, 50);
    assert_eq!(all.effective_top_k, 5);
    let total: f64 = all.top_predictions.iter().map(|p| p.probability_percentage).sum();
    assert!(total <= 100.0 + 1e-9);
    assert!(total > 99.0);
}

#[test]
fn test_service_error_classes() {
    let records = generate_seeded(&fixture_schema(), 200, 29).records;
    let service = trained_service(&records);

    let mut empty = request_for(&records[0], 5);
    empty.symptoms.clear();
    assert_eq!(service.predict(&empty).unwrap_err().status_code(), 400);

    let err = service.predict_json("not json").unwrap_err();
    assert_eq!(err.status_code(), 400);

    let body = r#"{"gender": "Khác", "age": 40, "location": "Huế",
        "visit_date": "2024-08-20", "symptoms": ["Sốt", "Đau răng"], "top_k": 2}"#;
    let response = service.predict_json(body).unwrap();
    assert_eq!(response.top_predictions.len(), 2);
    assert_eq!(response.unknown_labels, vec!["Khác", "Đau răng"]);
}

#[test]
fn test_catalogue_lists_trained_vocabulary() {
    let records = generate_seeded(&fixture_schema(), 300, 31).records;
    let service = trained_service(&records);
    let catalogue = service.catalogue();

    let mut diseases: Vec<String> = records.iter().map(|r| r.disease.clone()).collect();
    diseases.sort();
    diseases.dedup();
    assert_eq!(catalogue.diseases, diseases);
    assert!(catalogue.features.iter().any(|f| f == "symptom_sot"));
    // Parenthesized text is dropped from symptom keys
    assert!(catalogue.symptoms.contains(&"buon_non".to_string()));
}
