//! Run configuration for the binaries
//!
//! Both configurations start from their defaults and are overridden by
//! `HEALTH_SYNTH_*` environment variables. Parsing goes through a lookup
//! function so tests can supply variables without touching the process
//! environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, SynthError};
use crate::model::{BoostingParams, TreeParams};

/// Prefix shared by all configuration variables
pub const ENV_PREFIX: &str = "HEALTH_SYNTH_";

/// Configuration of a generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Number of records to generate
    pub record_count: usize,
    /// Schema JSON file
    pub schema_path: PathBuf,
    /// CSV output file
    pub output_path: PathBuf,
    /// Optional Parquet copy of the dataset
    pub parquet_path: Option<PathBuf>,
    /// Optional disease distribution report
    pub distribution_path: Option<PathBuf>,
    /// Seed for the random source; drawn from the OS when absent
    pub seed: Option<u64>,
    /// Abort when the schema report contains errors
    pub fail_on_schema_defects: bool,
    pub show_progress: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            record_count: 50_000,
            schema_path: PathBuf::from("data/schema.json"),
            output_path: PathBuf::from("fake_health_data_50k.csv"),
            parquet_path: None,
            distribution_path: Some(PathBuf::from("disease_distribution.csv")),
            seed: None,
            fail_on_schema_defects: false,
            show_progress: true,
        }
    }
}

impl GeneratorConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by the variables `lookup` returns
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars::new(lookup);
        let mut config = Self::default();

        if let Some(count) = vars.parse::<usize>("RECORDS")? {
            config.record_count = count;
        }
        if let Some(path) = vars.path("SCHEMA") {
            config.schema_path = path;
        }
        if let Some(path) = vars.path("OUTPUT") {
            config.output_path = path;
        }
        if let Some(value) = vars.raw("PARQUET") {
            config.parquet_path = optional_path(&value);
        }
        if let Some(value) = vars.raw("DISTRIBUTION") {
            config.distribution_path = optional_path(&value);
        }
        if let Some(seed) = vars.parse::<u64>("SEED")? {
            config.seed = Some(seed);
        }
        if let Some(strict) = vars.flag("STRICT")? {
            config.fail_on_schema_defects = strict;
        }
        if let Some(progress) = vars.flag("PROGRESS")? {
            config.show_progress = progress;
        }
        Ok(config)
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records:      {}", self.record_count)?;
        writeln!(f, "schema:       {}", self.schema_path.display())?;
        writeln!(f, "output:       {}", self.output_path.display())?;
        writeln!(f, "parquet:      {}", display_optional(self.parquet_path.as_ref()))?;
        writeln!(
            f,
            "distribution: {}",
            display_optional(self.distribution_path.as_ref())
        )?;
        writeln!(f, "seed:         {}", self.seed.map_or("random".to_string(), |s| s.to_string()))?;
        write!(f, "strict:       {}", self.fail_on_schema_defects)
    }
}

/// Configuration of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// CSV or Parquet dataset to train on
    pub dataset_path: PathBuf,
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub max_bins: usize,
    /// Share of the records held out for evaluation
    pub test_fraction: f64,
    pub seed: u64,
    /// Diseases listed by the sample prediction
    pub top_k: usize,
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let boosting = BoostingParams::default();
        Self {
            dataset_path: PathBuf::from("fake_health_data_50k.csv"),
            rounds: boosting.rounds,
            learning_rate: boosting.learning_rate,
            max_depth: boosting.tree.max_depth,
            max_bins: boosting.max_bins,
            test_fraction: 0.2,
            seed: 42,
            top_k: 5,
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars::new(lookup);
        let mut config = Self::default();

        if let Some(path) = vars.path("DATASET") {
            config.dataset_path = path;
        }
        if let Some(rounds) = vars.parse::<usize>("ROUNDS")? {
            config.rounds = rounds;
        }
        if let Some(rate) = vars.parse::<f64>("LEARNING_RATE")? {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(SynthError::Config(format!(
                    "{ENV_PREFIX}LEARNING_RATE must be positive, got {rate}"
                )));
            }
            config.learning_rate = rate;
        }
        if let Some(depth) = vars.parse::<usize>("MAX_DEPTH")? {
            config.max_depth = depth;
        }
        if let Some(bins) = vars.parse::<usize>("MAX_BINS")? {
            if !(2..=256).contains(&bins) {
                return Err(SynthError::Config(format!(
                    "{ENV_PREFIX}MAX_BINS must be within 2..=256, got {bins}"
                )));
            }
            config.max_bins = bins;
        }
        if let Some(fraction) = vars.parse::<f64>("TEST_FRACTION")? {
            if !(0.0..1.0).contains(&fraction) {
                return Err(SynthError::Config(format!(
                    "{ENV_PREFIX}TEST_FRACTION must be within [0, 1), got {fraction}"
                )));
            }
            config.test_fraction = fraction;
        }
        if let Some(seed) = vars.parse::<u64>("SEED")? {
            config.seed = seed;
        }
        if let Some(top_k) = vars.parse::<usize>("TOP_K")? {
            config.top_k = top_k;
        }
        if let Some(progress) = vars.flag("PROGRESS")? {
            config.show_progress = progress;
        }
        Ok(config)
    }

    /// Boosting parameters described by this configuration
    #[must_use]
    pub fn boosting_params(&self) -> BoostingParams {
        let defaults = BoostingParams::default();
        BoostingParams {
            rounds: self.rounds,
            learning_rate: self.learning_rate,
            max_bins: self.max_bins,
            tree: TreeParams {
                max_depth: self.max_depth,
                ..defaults.tree
            },
            show_progress: self.show_progress,
        }
    }
}

impl fmt::Display for TrainingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dataset:       {}", self.dataset_path.display())?;
        writeln!(f, "rounds:        {}", self.rounds)?;
        writeln!(f, "learning rate: {}", self.learning_rate)?;
        writeln!(f, "max depth:     {}", self.max_depth)?;
        writeln!(f, "max bins:      {}", self.max_bins)?;
        writeln!(f, "test fraction: {}", self.test_fraction)?;
        write!(f, "seed:          {}", self.seed)
    }
}

/// Prefixed variable access over a lookup function
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    const fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Trimmed value of `{ENV_PREFIX}{name}`; blank counts as unset
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(format!("{ENV_PREFIX}{name}").as_str())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        self.raw(name).map(PathBuf::from)
    }

    fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.raw(name)
            .map(|value| {
                value.parse().map_err(|e| {
                    SynthError::Config(format!("{ENV_PREFIX}{name}='{value}': {e}"))
                })
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<Option<bool>> {
        self.raw(name)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(SynthError::Config(format!(
                    "{ENV_PREFIX}{name}='{value}' is not a boolean"
                ))),
            })
            .transpose()
    }
}

/// `none` and `-` switch an optional output off
fn optional_path(value: &str) -> Option<PathBuf> {
    match value {
        "none" | "-" => None,
        path => Some(PathBuf::from(path)),
    }
}

fn display_optional(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "-".to_string(), |p| p.display().to_string())
}
