//! Disease prediction service
//!
//! Wraps a fitted feature encoder, the disease label encoder and a
//! [`DiseaseClassifier`]. Requests are validated, encoded and scored; the
//! response lists the `top_k` most probable diseases with percentages.
//!
//! Failures are classified the way an HTTP layer would report them: a
//! malformed request is a client error (400), an encoder/model disagreement or
//! an unusable model output is a server error (500).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureEncoder, LabelEncoder, PatientFeatures};
use crate::model::DiseaseClassifier;

/// Number of diseases returned when a request does not say
pub const DEFAULT_TOP_K: usize = 5;

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Errors reported by the prediction service
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// The request cannot be processed as sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The encoder and the model disagree on the feature layout
    #[error("Feature count mismatch: encoded {encoded} features, model expects {expected}")]
    FeatureMismatch { encoded: usize, expected: usize },

    /// The model returned something that is not a probability vector over the known diseases
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

impl PredictionError {
    /// HTTP-style status code of the error class
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::FeatureMismatch { .. } | Self::InvalidOutput(_) => 500,
        }
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

/// One prediction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub gender: String,
    pub age: u32,
    pub location: String,
    /// `YYYY-MM-DD`, optionally followed by a time of day
    pub visit_date: String,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Probability of one disease, as a percentage truncated to two decimals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseProbability {
    pub disease: String,
    pub probability_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    /// Most probable diseases first
    pub top_predictions: Vec<DiseaseProbability>,
    pub requested_top_k: usize,
    /// `requested_top_k` clamped to the number of known diseases
    pub effective_top_k: usize,
    /// Request labels the encoder did not know; they were ignored
    pub unknown_labels: Vec<String>,
    pub message: String,
}

/// Diseases and features known to the service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalogue {
    pub diseases: Vec<String>,
    pub symptoms: Vec<String>,
    pub features: Vec<String>,
}

/// Prediction service over any classifier
#[derive(Debug)]
pub struct PredictionService<C> {
    encoder: FeatureEncoder,
    labels: LabelEncoder,
    classifier: C,
}

impl<C: DiseaseClassifier> PredictionService<C> {
    pub fn new(encoder: FeatureEncoder, labels: LabelEncoder, classifier: C) -> Self {
        if encoder.feature_count() != classifier.feature_count() {
            log::warn!(
                "Encoder produces {} features but the model expects {}; predictions will fail",
                encoder.feature_count(),
                classifier.feature_count()
            );
        }
        Self {
            encoder,
            labels,
            classifier,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Diseases, symptom keys and feature names known to the service
    #[must_use]
    pub fn catalogue(&self) -> Catalogue {
        Catalogue {
            diseases: self.labels.classes().to_vec(),
            symptoms: self.encoder.known_symptoms().map(str::to_string).collect(),
            features: self.encoder.feature_names().to_vec(),
        }
    }

    /// Parse a JSON request body and predict
    pub fn predict_json(&self, body: &str) -> Result<PredictionResponse, PredictionError> {
        let request: PredictionRequest = serde_json::from_str(body)
            .map_err(|e| PredictionError::InvalidRequest(format!("malformed JSON body: {e}")))?;
        self.predict(&request)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictionError> {
        let visit_date = validate(request)?;
        log::info!(
            "Prediction request: top_k={}, age={}, gender={}, location={}, date={visit_date}",
            request.top_k,
            request.age,
            request.gender,
            request.location
        );

        let encoded = self.encoder.encode(PatientFeatures {
            gender: &request.gender,
            age: request.age as f32,
            location: &request.location,
            visit_date,
            symptoms: &request.symptoms,
            risk_factors: &request.risk_factors,
        });

        let expected = self.classifier.feature_count();
        if encoded.values.len() != expected {
            log::error!(
                "Feature count mismatch: {} vs {expected}",
                encoded.values.len()
            );
            return Err(PredictionError::FeatureMismatch {
                encoded: encoded.values.len(),
                expected,
            });
        }

        let probabilities = self.classifier.predict_proba(&encoded.values);
        self.check_output(&probabilities)?;

        let class_count = probabilities.len();
        let mut effective_top_k = request.top_k;
        if effective_top_k > class_count {
            log::warn!(
                "Requested top_k={} but only {class_count} diseases are known; returning all",
                request.top_k
            );
            effective_top_k = class_count;
        }

        let mut ranked: Vec<(usize, f64)> = probabilities.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let top_predictions = ranked
            .into_iter()
            .take(effective_top_k)
            .map(|(class, probability)| {
                let disease = self.labels.decode(class).ok_or_else(|| {
                    PredictionError::InvalidOutput(format!("class {class} has no disease label"))
                })?;
                Ok(DiseaseProbability {
                    disease: disease.to_string(),
                    probability_percentage: truncated_percentage(probability),
                })
            })
            .collect::<Result<Vec<_>, PredictionError>>()?;

        let message = if encoded.unknown_labels.is_empty() {
            "Prediction successful".to_string()
        } else {
            log::warn!("Ignored unknown labels: {:?}", encoded.unknown_labels);
            "Prediction successful; unknown labels were ignored".to_string()
        };
        log::info!(
            "Predicted top diseases: {:?}",
            top_predictions.iter().map(|p| p.disease.as_str()).collect::<Vec<_>>()
        );

        Ok(PredictionResponse {
            top_predictions,
            requested_top_k: request.top_k,
            effective_top_k,
            unknown_labels: encoded.unknown_labels,
            message,
        })
    }

    fn check_output(&self, probabilities: &[f64]) -> Result<(), PredictionError> {
        let classes = self.labels.class_count();
        if probabilities.len() != classes {
            return Err(PredictionError::InvalidOutput(format!(
                "{} probabilities for {classes} diseases",
                probabilities.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PredictionError::InvalidOutput(
                "probabilities must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = probabilities.iter().sum();
        if classes > 0 && (total - 1.0).abs() > 1e-6 {
            return Err(PredictionError::InvalidOutput(format!(
                "probabilities sum to {total}"
            )));
        }
        Ok(())
    }
}

/// Check the request and parse its visit date
fn validate(request: &PredictionRequest) -> Result<NaiveDate, PredictionError> {
    if request.top_k == 0 {
        return Err(PredictionError::InvalidRequest(
            "top_k must be at least 1".to_string(),
        ));
    }
    if request.symptoms.iter().all(|s| s.trim().is_empty()) {
        return Err(PredictionError::InvalidRequest(
            "symptom list must not be empty".to_string(),
        ));
    }
    let date = request
        .visit_date
        .trim()
        .split(['T', ' '])
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        PredictionError::InvalidRequest(format!("invalid visit_date '{}': {e}", request.visit_date))
    })
}

/// `probability` in percent, truncated (not rounded) to two decimals
fn truncated_percentage(probability: f64) -> f64 {
    // Absorbs representation error so exact hundredths such as 0.57 stay whole
    ((probability * 10_000.0) + 1e-9).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientRecord, Season};

    /// Classifier returning fixed probabilities
    struct FixedClassifier {
        features: usize,
        probabilities: Vec<f64>,
    }

    impl DiseaseClassifier for FixedClassifier {
        fn feature_count(&self) -> usize {
            self.features
        }

        fn class_count(&self) -> usize {
            self.probabilities.len()
        }

        fn predict_proba(&self, _features: &[f32]) -> Vec<f64> {
            self.probabilities.clone()
        }
    }

    fn service(probabilities: Vec<f64>) -> PredictionService<FixedClassifier> {
        let visit_date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let records: Vec<PatientRecord> = ["cum", "gout", "viem_phoi"]
            .iter()
            .map(|disease| PatientRecord {
                gender: "Nam".to_string(),
                age: 50,
                location: "Hà Nội".to_string(),
                visit_date,
                season: Season::of(visit_date),
                disease: disease.to_string(),
                symptoms: vec!["Sốt".to_string(), "Đau khớp".to_string()],
                risk_factors: vec!["Rượu bia".to_string()],
            })
            .collect();
        let encoder = FeatureEncoder::fit(&records);
        let labels = LabelEncoder::fit(records.iter().map(|r| r.disease.as_str()));
        let classifier = FixedClassifier {
            features: encoder.feature_count(),
            probabilities,
        };
        PredictionService::new(encoder, labels, classifier)
    }

    fn request(top_k: usize) -> PredictionRequest {
        PredictionRequest {
            gender: "Nam".to_string(),
            age: 61,
            location: "Hà Nội".to_string(),
            visit_date: "2024-02-14".to_string(),
            symptoms: vec!["Đau khớp".to_string()],
            risk_factors: vec![],
            top_k,
        }
    }

    #[test]
    fn test_predictions_sorted_and_truncated() {
        let service = service(vec![0.123456, 0.666666, 0.209878]);
        let response = service.predict(&request(2)).unwrap();
        assert_eq!(response.effective_top_k, 2);
        assert_eq!(response.top_predictions.len(), 2);
        assert_eq!(response.top_predictions[0].disease, "gout");
        assert!((response.top_predictions[0].probability_percentage - 66.66).abs() < 1e-9);
        assert_eq!(response.top_predictions[1].disease, "viem_phoi");
        assert!((response.top_predictions[1].probability_percentage - 20.98).abs() < 1e-9);
        assert!(response.unknown_labels.is_empty());
    }

    #[test]
    fn test_top_k_is_clamped() {
        let service = service(vec![0.2, 0.3, 0.5]);
        let response = service.predict(&request(10)).unwrap();
        assert_eq!(response.requested_top_k, 10);
        assert_eq!(response.effective_top_k, 3);
        let total: f64 = response
            .top_predictions
            .iter()
            .map(|p| p.probability_percentage)
            .sum();
        assert!(total <= 100.0 + 1e-9);
        assert!(
            response
                .top_predictions
                .windows(2)
                .all(|w| w[0].probability_percentage >= w[1].probability_percentage)
        );
    }

    #[test]
    fn test_client_errors() {
        let service = service(vec![0.2, 0.3, 0.5]);

        let err = service.predict(&request(0)).unwrap_err();
        assert_eq!(err.status_code(), 400);

        let mut empty = request(3);
        empty.symptoms = vec![" ".to_string()];
        assert_eq!(service.predict(&empty).unwrap_err().status_code(), 400);

        let mut bad_date = request(3);
        bad_date.visit_date = "14/02/2024".to_string();
        assert_eq!(service.predict(&bad_date).unwrap_err().status_code(), 400);

        let err = service.predict_json("{\"gender\": \"Nam\"}").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_server_errors() {
        let mut mismatched = service(vec![0.2, 0.3, 0.5]);
        mismatched.classifier.features += 1;
        let err = mismatched.predict(&request(3)).unwrap_err();
        assert!(matches!(err, PredictionError::FeatureMismatch { .. }));
        assert_eq!(err.status_code(), 500);

        let wrong_classes = service(vec![0.5, 0.5]);
        assert_eq!(wrong_classes.predict(&request(3)).unwrap_err().status_code(), 500);

        let not_probabilities = service(vec![f64::NAN, 0.5, 0.5]);
        assert_eq!(not_probabilities.predict(&request(3)).unwrap_err().status_code(), 500);
    }

    #[test]
    fn test_json_request_and_unknown_labels() {
        let service = service(vec![0.6, 0.3, 0.1]);
        let body = r#"{
            "gender": "Nữ",
            "age": 35,
            "location": "Hà Nội",
            "visit_date": "2024-06-01T08:30:00",
            "symptoms": ["Sốt", "Mất ngủ"]
        }"#;
        let response = service.predict_json(body).unwrap();
        assert_eq!(response.requested_top_k, DEFAULT_TOP_K);
        assert_eq!(response.effective_top_k, 3);
        assert_eq!(response.unknown_labels, vec!["Nữ", "Mất ngủ"]);
        assert_eq!(response.top_predictions[0].disease, "cum");
    }

    #[test]
    fn test_catalogue() {
        let service = service(vec![0.2, 0.3, 0.5]);
        let catalogue = service.catalogue();
        assert_eq!(catalogue.diseases, vec!["cum", "gout", "viem_phoi"]);
        assert_eq!(catalogue.symptoms, vec!["dau_khop", "sot"]);
        assert_eq!(catalogue.features.len(), service.classifier().feature_count());
    }

    #[test]
    fn test_truncated_percentage() {
        assert!((truncated_percentage(0.99999) - 99.99).abs() < 1e-9);
        assert!((truncated_percentage(1.0) - 100.0).abs() < 1e-9);
        assert!(truncated_percentage(0.00001).abs() < 1e-12);
        assert!((truncated_percentage(0.57) - 57.0).abs() < 1e-9);
        assert!((truncated_percentage(0.1234) - 12.34).abs() < 1e-9);
        assert!((truncated_percentage(0.56999) - 56.99).abs() < 1e-9);
    }
}
