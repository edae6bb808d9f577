//! Train the disease classifier on a generated dataset and run a sample prediction
//!
//! Reads the dataset named by `HEALTH_SYNTH_DATASET` (CSV or Parquet), holds
//! out a test split, trains the boosted ensemble, reports accuracy and then
//! serves one prediction built from a held-out record.

use std::time::Instant;

use anyhow::{Context, bail};
use health_synth::dataset::read_records;
use health_synth::model::train_test_split;
use health_synth::utils::logging::console::print_prediction;
use health_synth::utils::logging::{create_spinner, finish_and_clear};
use health_synth::{
    FeatureEncoder, GradientBoostedClassifier, LabelEncoder, PredictionRequest,
    PredictionService, TrainingConfig,
};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = TrainingConfig::from_env().context("invalid HEALTH_SYNTH_* configuration")?;
    info!("Training settings:\n{config}");

    let records = read_records(&config.dataset_path)?;
    if records.is_empty() {
        bail!("dataset {} contains no records", config.dataset_path.display());
    }

    let spinner = config.show_progress.then(|| create_spinner(Some("Encoding features")));
    let start = Instant::now();
    let encoder = FeatureEncoder::fit(&records);
    let labels = LabelEncoder::fit(records.iter().map(|r| r.disease.as_str()));
    let features = encoder.encode_records(&records);
    let targets = records
        .iter()
        .map(|r| labels.encode(&r.disease).context("disease missing from label encoder"))
        .collect::<anyhow::Result<Vec<usize>>>()?;
    if let Some(spinner) = &spinner {
        finish_and_clear(spinner);
    }
    info!(
        "Encoded {} records into {} features and {} diseases in {:?}",
        features.rows(),
        features.columns(),
        labels.class_count(),
        start.elapsed()
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train, test) = train_test_split(records.len(), config.test_fraction, &mut rng);
    let select_targets = |indices: &[usize]| indices.iter().map(|&i| targets[i]).collect::<Vec<_>>();
    let (train_x, train_y) = (features.select(&train), select_targets(&train));
    let (test_x, test_y) = (features.select(&test), select_targets(&test));
    info!("Split into {} training and {} test rows", train.len(), test.len());

    let model = GradientBoostedClassifier::fit(
        &train_x,
        &train_y,
        labels.class_count(),
        &config.boosting_params(),
    )?;
    info!("Training accuracy: {:.4}", model.accuracy(&train_x, &train_y));
    if !test.is_empty() {
        info!("Test accuracy: {:.4}", model.accuracy(&test_x, &test_y));
    }

    let sample = &records[test.first().copied().unwrap_or(0)];
    let service = PredictionService::new(encoder, labels, model);
    let catalogue = service.catalogue();
    info!(
        "Serving {} diseases over {} features ({} known symptoms)",
        catalogue.diseases.len(),
        catalogue.features.len(),
        catalogue.symptoms.len()
    );

    let request = PredictionRequest {
        gender: sample.gender.clone(),
        age: sample.age,
        location: sample.location.clone(),
        visit_date: sample.visit_date.format("%Y-%m-%d").to_string(),
        symptoms: sample.symptoms.clone(),
        risk_factors: sample.risk_factors.clone(),
        top_k: config.top_k,
    };
    info!("Sample request for a record labelled '{}'", sample.disease);
    let response = service.predict(&request)?;
    print_prediction(&response);

    Ok(())
}
