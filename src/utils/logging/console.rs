//! End-of-run summaries printed by the binaries

use std::collections::BTreeMap;
use std::time::Duration;

use crate::algorithm::{DiseaseDistribution, DiseaseFrequency, GenerationOutcome};
use crate::models::Season;
use crate::predict::PredictionResponse;

/// Print the accounting of a generation run
pub fn print_generation_summary(outcome: &GenerationOutcome, elapsed: Duration) {
    println!("Generated {outcome} in {elapsed:?}");
    if !outcome.is_complete() {
        println!("Short by {} records", outcome.shortfall());
    }
}

/// Print the `n` most and least frequent diseases
pub fn print_distribution_summary(distribution: &DiseaseDistribution, n: usize) {
    println!("Records: {}", distribution.total);
    println!("Top {n} most common diseases:");
    print!("{}", format_rows(distribution.most_common(n)));
    println!("Top {n} least common diseases:");
    print!("{}", format_rows(distribution.least_common(n)));
}

/// Print the leading disease of every season
pub fn print_season_summary(by_season: &BTreeMap<Season, DiseaseDistribution>) {
    println!("Most common disease per season:");
    for (season, distribution) in by_season {
        if let Some(top) = distribution.most_common(1).first() {
            println!(
                "  {:<10} {} ({:.2}% of {} records)",
                season.label(),
                top.disease,
                top.percentage,
                distribution.total
            );
        }
    }
}

/// Print a prediction response as a ranked list
pub fn print_prediction(response: &PredictionResponse) {
    println!(
        "Top {} predictions (requested {}):",
        response.effective_top_k, response.requested_top_k
    );
    for (rank, prediction) in response.top_predictions.iter().enumerate() {
        println!(
            "  {}. {:<32} {:>6.2}%",
            rank + 1,
            prediction.disease,
            prediction.probability_percentage
        );
    }
    if !response.unknown_labels.is_empty() {
        println!("Ignored labels: {}", response.unknown_labels.join(", "));
    }
}

fn format_rows(rows: &[DiseaseFrequency]) -> String {
    rows.iter()
        .map(|row| format!("  {:<32} {:>8} {:>7.2}%\n", row.disease, row.count, row.percentage))
        .collect()
}
