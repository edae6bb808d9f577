//! Weighted record sampler
//!
//! One call to [`RecordSampler::draw`] produces one complete [`PatientRecord`]
//! or names the step that made the draw impossible. Draw order is fixed:
//! gender, age, region, location, visit date, season, disease, symptoms and
//! risk factors.
//!
//! Disease selection composes four layers for every disease of the universe:
//! a constant base weight of 1.0, the weight of the disease's category (0 when
//! the category has no entry), the multiplier of the drawn region for that
//! category (1.0 when absent) and the multiplier of the drawn season for that
//! disease (1.0 when absent). The composed weights only depend on the region
//! and the season, so they are computed once per pair when the sampler is
//! built.

use chrono::{Days, NaiveDate};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use rustc_hash::FxHashMap;

use crate::algorithm::weighted::{choose_weighted_index, weighted_choice};
use crate::models::{PatientRecord, Season};
use crate::schema::{DiseaseEntry, Schema};

/// Weight every disease starts from before the layers are applied
const BASE_WEIGHT: f64 = 1.0;

/// Upper bound on the number of symptoms in one record
pub const MAX_SYMPTOMS: usize = 4;
/// Upper bound on the number of risk factors in one record
pub const MAX_RISK_FACTORS: usize = 3;

/// Reason a single draw produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum DrawFailure {
    #[error("no gender to choose from")]
    NoGender,
    #[error("age range is empty")]
    EmptyAgeRange,
    #[error("no region has a usable weight")]
    NoRegion,
    #[error("the chosen region has no locations")]
    NoLocation,
    #[error("date range is empty")]
    EmptyDateRange,
    #[error("no disease has a usable weight")]
    NoDisease,
}

/// Draws patient records from a borrowed schema
#[derive(Debug)]
pub struct RecordSampler<'a> {
    schema: &'a Schema,
    universe: Vec<DiseaseEntry<'a>>,
    region_keys: Vec<&'a str>,
    region_weights: Vec<Option<f64>>,
    disease_weights: FxHashMap<(&'a str, Season), Vec<Option<f64>>>,
}

impl<'a> RecordSampler<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        let universe = schema.disease_universe();
        let region_keys: Vec<&str> = schema.regions.keys().map(String::as_str).collect();
        // An unweighted region counts as weight 0 and stays in the uniform fallback
        let region_weights = region_keys
            .iter()
            .map(|region| Some(schema.weights.regions.get(*region).copied().unwrap_or(0.0)))
            .collect();

        let mut disease_weights = FxHashMap::default();
        for region in &region_keys {
            for season in Season::ALL {
                disease_weights.insert(
                    (*region, season),
                    combined_weights(schema, &universe, region, season),
                );
            }
        }

        Self {
            schema,
            universe,
            region_keys,
            region_weights,
            disease_weights,
        }
    }

    /// Distinct diseases this sampler draws from
    #[must_use]
    pub fn universe(&self) -> &[DiseaseEntry<'a>] {
        &self.universe
    }

    /// Composed disease weights for a region and season, parallel to [`Self::universe`]
    #[must_use]
    pub fn disease_weights(&self, region: &str, season: Season) -> Vec<Option<f64>> {
        self.disease_weights
            .get(&(region, season))
            .cloned()
            .unwrap_or_else(|| combined_weights(self.schema, &self.universe, region, season))
    }

    /// Choose a disease key for a draw located in `region` during `season`
    pub fn select_disease<R: Rng + ?Sized>(
        &self,
        region: &str,
        season: Season,
        rng: &mut R,
    ) -> Option<&'a str> {
        let index = match self.disease_weights.get(&(region, season)) {
            Some(weights) => choose_weighted_index(weights, self.universe.len(), rng),
            None => {
                let weights = combined_weights(self.schema, &self.universe, region, season);
                choose_weighted_index(&weights, self.universe.len(), rng)
            }
        }?;
        Some(self.universe[index].disease)
    }

    /// Perform one complete draw
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PatientRecord, DrawFailure> {
        let schema = self.schema;

        let gender = schema.genders.choose(rng).ok_or(DrawFailure::NoGender)?;

        let age_range = schema.age_range;
        if age_range.min > age_range.max {
            return Err(DrawFailure::EmptyAgeRange);
        }
        let age = rng.random_range(age_range.min..=age_range.max);

        let region = *weighted_choice(&self.region_keys, &self.region_weights, rng)
            .ok_or(DrawFailure::NoRegion)?;
        let location = schema
            .regions
            .get(region)
            .and_then(|locations| locations.choose(rng))
            .ok_or(DrawFailure::NoLocation)?;

        let visit_date = draw_date(schema.date_range.start, schema.date_range.day_span(), rng)
            .ok_or(DrawFailure::EmptyDateRange)?;
        let season = Season::of(visit_date);

        let disease = self
            .select_disease(region, season, rng)
            .ok_or(DrawFailure::NoDisease)?;

        let symptoms = sample_subset(schema.symptoms_of(disease), MAX_SYMPTOMS, rng);
        let risk_factors = sample_subset(schema.risk_factors_of(disease), MAX_RISK_FACTORS, rng);

        Ok(PatientRecord {
            gender: gender.clone(),
            age,
            location: location.clone(),
            visit_date,
            season,
            disease: disease.to_string(),
            symptoms,
            risk_factors,
        })
    }
}

/// Weight of every universe entry for one region and season
fn combined_weights(
    schema: &Schema,
    universe: &[DiseaseEntry<'_>],
    region: &str,
    season: Season,
) -> Vec<Option<f64>> {
    let weights = &schema.weights;
    let regional = weights.region_category_multipliers.get(region);
    let seasonal = weights.season_disease_multipliers.get(season.label());

    universe
        .iter()
        .map(|entry| {
            let category_weight = weights.categories.get(entry.category).copied().unwrap_or(0.0);
            let regional_weight = regional
                .and_then(|m| m.get(entry.category))
                .copied()
                .unwrap_or(1.0);
            let seasonal_weight = seasonal
                .and_then(|m| m.get(entry.disease))
                .copied()
                .unwrap_or(1.0);
            Some(BASE_WEIGHT * category_weight * regional_weight * seasonal_weight)
        })
        .collect()
}

/// Uniform date in `[start, start + span]`
fn draw_date<R: Rng + ?Sized>(start: NaiveDate, span: Option<i64>, rng: &mut R) -> Option<NaiveDate> {
    let span = u64::try_from(span?).ok()?;
    let offset = rng.random_range(0..=span);
    start.checked_add_days(Days::new(offset))
}

/// Between 1 and `max` distinct items of `pool`, empty when the pool is empty
fn sample_subset<R: Rng + ?Sized>(pool: &[String], max: usize, rng: &mut R) -> Vec<String> {
    if pool.is_empty() {
        return Vec::new();
    }
    let count = rng.random_range(1..=pool.len().min(max));
    let mut indices: Vec<usize> = (0..pool.len()).collect();
    let (chosen, _) = indices.partial_shuffle(rng, count);
    chosen.iter().map(|&i| pool[i].clone()).collect()
}
