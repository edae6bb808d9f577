//! Structural validation of a generation schema.
//!
//! Validation never fails: every check runs and each violated check becomes
//! one [`SchemaDefect`] naming the offending keys. Callers decide whether a
//! report with errors should abort generation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;

use crate::models::Season;
use crate::schema::Schema;

/// How serious a defect is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Generation still produces sensible records (e.g. empty subsets)
    Warning,
    /// Some diseases, regions or weights silently stop participating
    Error,
}

/// The individual checks performed by [`validate_schema`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefectKind {
    /// Diseases with no entry in the symptom table
    MissingSymptoms,
    /// Diseases with no entry in the risk-factor table
    MissingRiskFactors,
    /// Diseases whose symptom list is present but empty
    EmptySymptomList,
    /// Diseases whose risk-factor list is present but empty
    EmptyRiskFactorList,
    /// Categories weighted in `weights.categories` but not declared
    UnknownWeightedCategory,
    /// Regions with multipliers but not declared in `regions`
    UnknownMultiplierRegion,
    /// Categories inside a region's multipliers that are not declared
    UnknownMultiplierCategory { region: String },
    /// Diseases inside a season's multipliers that are not declared
    UnknownSeasonDisease { season: String },
    /// Categories listing no disease at all
    EmptyCategory,
    /// Categories containing an empty disease key
    EmptyDiseaseKey,
    /// Diseases listed under more than one category
    DuplicateDisease,
    /// Regions weighted in `weights.regions` but not declared
    UnknownWeightedRegion,
    /// Regions without any location
    RegionWithoutLocations,
    /// Season labels outside the four fixed calendar partitions
    UnknownSeason,
    /// Negative or non-finite weights and multipliers (`table:key`)
    InvalidWeight,
    /// No gender labels to draw from
    NoGenders,
    /// `age_range.min` greater than `age_range.max`
    InvalidAgeRange,
    /// `date_range.end` before `date_range.start`
    InvalidDateRange,
}

impl DefectKind {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EmptySymptomList
            | Self::EmptyRiskFactorList
            | Self::EmptyCategory
            | Self::EmptyDiseaseKey => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSymptoms => write!(f, "diseases missing a symptom list"),
            Self::MissingRiskFactors => write!(f, "diseases missing a risk-factor list"),
            Self::EmptySymptomList => write!(f, "diseases with an empty symptom list"),
            Self::EmptyRiskFactorList => write!(f, "diseases with an empty risk-factor list"),
            Self::UnknownWeightedCategory => {
                write!(f, "weighted categories not present in the taxonomy")
            }
            Self::UnknownMultiplierRegion => {
                write!(f, "regional multipliers for undeclared regions")
            }
            Self::UnknownMultiplierCategory { region } => {
                write!(f, "undeclared categories in multipliers of region '{region}'")
            }
            Self::UnknownSeasonDisease { season } => {
                write!(f, "undeclared diseases in multipliers of season '{season}'")
            }
            Self::EmptyCategory => write!(f, "categories without diseases"),
            Self::EmptyDiseaseKey => write!(f, "categories containing an empty disease key"),
            Self::DuplicateDisease => write!(f, "diseases listed under several categories"),
            Self::UnknownWeightedRegion => write!(f, "weighted regions not declared"),
            Self::RegionWithoutLocations => write!(f, "regions without locations"),
            Self::UnknownSeason => write!(f, "unknown season labels"),
            Self::InvalidWeight => write!(f, "negative or non-finite weights"),
            Self::NoGenders => write!(f, "no gender labels"),
            Self::InvalidAgeRange => write!(f, "age range minimum exceeds maximum"),
            Self::InvalidDateRange => write!(f, "date range ends before it starts"),
        }
    }
}

/// One violated check and the keys that violate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefect {
    pub kind: DefectKind,
    /// Offending keys, sorted
    pub keys: Vec<String>,
}

impl SchemaDefect {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for SchemaDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{label}] {}", self.kind)?;
        if !self.keys.is_empty() {
            write!(f, ": {}", self.keys.join(", "))?;
        }
        Ok(())
    }
}

/// Result of validating a schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub defects: Vec<SchemaDefect>,
}

impl SchemaReport {
    /// No defect of any severity
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.defects.iter().any(|d| d.severity() == Severity::Error)
    }

    #[must_use]
    pub fn errors(&self) -> impl Iterator<Item = &SchemaDefect> {
        self.defects.iter().filter(|d| d.severity() == Severity::Error)
    }

    #[must_use]
    pub fn warnings(&self) -> impl Iterator<Item = &SchemaDefect> {
        self.defects
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
    }

    /// The defect of a given kind, if that check failed
    #[must_use]
    pub fn find(&self, kind: &DefectKind) -> Option<&SchemaDefect> {
        self.defects.iter().find(|d| &d.kind == kind)
    }

    /// Log every defect at warn level (errors) or info level (warnings)
    pub fn log(&self) {
        if self.is_clean() {
            log::info!("Schema OK: no structural defects found");
            return;
        }
        for defect in &self.defects {
            match defect.severity() {
                Severity::Error => log::warn!("Schema defect {defect}"),
                Severity::Warning => log::info!("Schema defect {defect}"),
            }
        }
    }

    fn push<I, S>(&mut self, kind: DefectKind, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::<String>::into).sorted().dedup().collect();
        if !keys.is_empty() {
            self.defects.push(SchemaDefect { kind, keys });
        }
    }

    fn push_flag(&mut self, kind: DefectKind, violated: bool, detail: String) {
        if violated {
            self.defects.push(SchemaDefect {
                kind,
                keys: vec![detail],
            });
        }
    }
}

impl fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Schema OK");
        }
        writeln!(f, "Schema defects ({}):", self.defects.len())?;
        for defect in &self.defects {
            writeln!(f, "  {defect}")?;
        }
        Ok(())
    }
}

/// Check a schema for structural defects
///
/// All checks run independently; the report lists every violated check.
#[must_use]
pub fn validate_schema(schema: &Schema) -> SchemaReport {
    let mut report = SchemaReport::default();

    let all_diseases: BTreeSet<&str> = schema
        .disease_categories
        .values()
        .flatten()
        .map(String::as_str)
        .filter(|d| !d.is_empty())
        .collect();

    report.push(
        DefectKind::MissingSymptoms,
        all_diseases
            .iter()
            .filter(|d| !schema.symptoms.contains_key(**d))
            .copied(),
    );
    report.push(
        DefectKind::MissingRiskFactors,
        all_diseases
            .iter()
            .filter(|d| !schema.risk_factors.contains_key(**d))
            .copied(),
    );
    report.push(
        DefectKind::EmptySymptomList,
        all_diseases
            .iter()
            .filter(|d| schema.symptoms.get(**d).is_some_and(Vec::is_empty))
            .copied(),
    );
    report.push(
        DefectKind::EmptyRiskFactorList,
        all_diseases
            .iter()
            .filter(|d| schema.risk_factors.get(**d).is_some_and(Vec::is_empty))
            .copied(),
    );

    report.push(
        DefectKind::UnknownWeightedCategory,
        schema
            .weights
            .categories
            .keys()
            .filter(|c| !schema.disease_categories.contains_key(*c))
            .cloned(),
    );

    report.push(
        DefectKind::UnknownMultiplierRegion,
        schema
            .weights
            .region_category_multipliers
            .keys()
            .filter(|r| !schema.regions.contains_key(*r))
            .cloned(),
    );
    for (region, multipliers) in &schema.weights.region_category_multipliers {
        report.push(
            DefectKind::UnknownMultiplierCategory {
                region: region.clone(),
            },
            multipliers
                .keys()
                .filter(|c| !schema.disease_categories.contains_key(*c))
                .cloned(),
        );
    }

    for (season, multipliers) in &schema.weights.season_disease_multipliers {
        report.push(
            DefectKind::UnknownSeasonDisease {
                season: season.clone(),
            },
            multipliers
                .keys()
                .filter(|d| !all_diseases.contains(d.as_str()))
                .cloned(),
        );
    }

    check_taxonomy(schema, &mut report);
    check_regions_and_seasons(schema, &mut report);
    check_weights(schema, &mut report);

    report.push_flag(DefectKind::NoGenders, schema.genders.is_empty(), "genders".into());
    report.push_flag(
        DefectKind::InvalidAgeRange,
        schema.age_range.min > schema.age_range.max,
        format!("{}..={}", schema.age_range.min, schema.age_range.max),
    );
    report.push_flag(
        DefectKind::InvalidDateRange,
        schema.date_range.day_span().is_none(),
        format!("{}..={}", schema.date_range.start, schema.date_range.end),
    );

    report
}

fn check_taxonomy(schema: &Schema, report: &mut SchemaReport) {
    report.push(
        DefectKind::EmptyCategory,
        schema
            .disease_categories
            .iter()
            .filter(|(_, diseases)| diseases.is_empty())
            .map(|(category, _)| category.clone()),
    );
    report.push(
        DefectKind::EmptyDiseaseKey,
        schema
            .disease_categories
            .iter()
            .filter(|(_, diseases)| diseases.iter().any(String::is_empty))
            .map(|(category, _)| category.clone()),
    );

    let mut categories_per_disease: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (category, diseases) in &schema.disease_categories {
        for disease in diseases.iter().filter(|d| !d.is_empty()) {
            categories_per_disease
                .entry(disease.as_str())
                .or_default()
                .insert(category.as_str());
        }
    }
    report.push(
        DefectKind::DuplicateDisease,
        categories_per_disease
            .into_iter()
            .filter(|(_, categories)| categories.len() > 1)
            .map(|(disease, _)| disease),
    );
}

fn check_regions_and_seasons(schema: &Schema, report: &mut SchemaReport) {
    report.push(
        DefectKind::UnknownWeightedRegion,
        schema
            .weights
            .regions
            .keys()
            .filter(|r| !schema.regions.contains_key(*r))
            .cloned(),
    );
    report.push(
        DefectKind::RegionWithoutLocations,
        schema
            .regions
            .iter()
            .filter(|(_, locations)| locations.is_empty())
            .map(|(region, _)| region.clone()),
    );
    report.push(
        DefectKind::UnknownSeason,
        schema
            .weights
            .season_disease_multipliers
            .keys()
            .filter(|label| Season::from_label(label).is_none())
            .cloned(),
    );
}

fn is_invalid_weight(weight: f64) -> bool {
    !weight.is_finite() || weight < 0.0
}

fn check_weights(schema: &Schema, report: &mut SchemaReport) {
    let weights = &schema.weights;

    let flat = weights
        .categories
        .iter()
        .filter(|(_, w)| is_invalid_weight(**w))
        .map(|(k, _)| format!("categories:{k}"))
        .chain(
            weights
                .regions
                .iter()
                .filter(|(_, w)| is_invalid_weight(**w))
                .map(|(k, _)| format!("regions:{k}")),
        );
    let nested = weights
        .region_category_multipliers
        .iter()
        .flat_map(|(region, m)| {
            m.iter()
                .filter(|(_, w)| is_invalid_weight(**w))
                .map(move |(k, _)| format!("region_category_multipliers:{region}:{k}"))
        })
        .chain(weights.season_disease_multipliers.iter().flat_map(|(season, m)| {
            m.iter()
                .filter(|(_, w)| is_invalid_weight(**w))
                .map(move |(k, _)| format!("season_disease_multipliers:{season}:{k}"))
        }));

    report.push(DefectKind::InvalidWeight, flat.chain(nested));
}
