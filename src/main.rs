use std::time::Instant;

use anyhow::{Context, bail};
use health_synth::algorithm::{GenerationOptions, distribution_by_season, generate_records_with};
use health_synth::dataset::{write_distribution_csv, write_records_csv, write_records_parquet};
use health_synth::utils::logging::console::{
    print_distribution_summary, print_generation_summary, print_season_summary,
};
use health_synth::{DiseaseDistribution, GeneratorConfig, Schema, validate_schema};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GeneratorConfig::from_env().context("invalid HEALTH_SYNTH_* configuration")?;
    info!("Generation settings:\n{config}");

    let schema = Schema::from_path(&config.schema_path)?;
    let report = validate_schema(&schema);
    report.log();
    if report.has_errors() {
        if config.fail_on_schema_defects {
            bail!("schema {} has structural defects:\n{report}", config.schema_path.display());
        }
        warn!("Continuing despite schema defects; affected diseases may be skipped or unreachable");
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let start = Instant::now();
    let outcome = generate_records_with(
        &schema,
        config.record_count,
        GenerationOptions {
            show_progress: config.show_progress,
        },
        &mut rng,
    );
    print_generation_summary(&outcome, start.elapsed());

    if outcome.records.is_empty() {
        bail!("no records could be generated from {}", config.schema_path.display());
    }

    write_records_csv(&config.output_path, &outcome.records)?;
    if let Some(path) = &config.parquet_path {
        write_records_parquet(path, &outcome.records)?;
    }

    let distribution = DiseaseDistribution::from_records(&outcome.records);
    if let Some(path) = &config.distribution_path {
        write_distribution_csv(path, &distribution)?;
    }
    print_distribution_summary(&distribution, 5);
    print_season_summary(&distribution_by_season(&outcome.records));

    Ok(())
}
