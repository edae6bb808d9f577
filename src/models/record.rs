//! Patient record entity model
//!
//! A [`PatientRecord`] is the unit of the synthetic dataset: demographics, a
//! visit date with its derived season, one disease and a subset of that
//! disease's symptoms and risk factors.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Climate season, fixed three-month calendar partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// January to March
    #[serde(rename = "Đông-Xuân")]
    WinterSpring,
    /// April to June
    #[serde(rename = "Xuân-Hè")]
    SpringSummer,
    /// July to September
    #[serde(rename = "Hè-Thu")]
    SummerAutumn,
    /// October to December
    #[serde(rename = "Thu-Đông")]
    AutumnWinter,
}

impl Season {
    pub const ALL: [Self; 4] = [
        Self::WinterSpring,
        Self::SpringSummer,
        Self::SummerAutumn,
        Self::AutumnWinter,
    ];

    /// Season covering a calendar month (1-12); months past 12 map to the last season
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            0..=3 => Self::WinterSpring,
            4..=6 => Self::SpringSummer,
            7..=9 => Self::SummerAutumn,
            _ => Self::AutumnWinter,
        }
    }

    /// Season of a calendar date
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    /// Label used as key in the seasonal weight table and in datasets
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WinterSpring => "Đông-Xuân",
            Self::SpringSummer => "Xuân-Hè",
            Self::SummerAutumn => "Hè-Thu",
            Self::AutumnWinter => "Thu-Đông",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|season| season.label() == label)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One generated patient visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub gender: String,
    pub age: u32,
    /// Location inside the region drawn for this record
    pub location: String,
    pub visit_date: NaiveDate,
    /// Always `Season::of(visit_date)`
    pub season: Season,
    /// Normalized disease key
    pub disease: String,
    /// Distinct symptom labels of `disease`
    pub symptoms: Vec<String>,
    /// Distinct risk-factor labels of `disease`
    pub risk_factors: Vec<String>,
}

impl PatientRecord {
    /// Column names, in the order used by the tabular sinks
    pub const COLUMNS: [&'static str; 8] = [
        "gender",
        "age",
        "location",
        "visit_date",
        "season",
        "disease",
        "symptoms",
        "risk_factors",
    ];
}
