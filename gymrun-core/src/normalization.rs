//! Normalization of state and action features.
//!
//! Environments describe each raw feature with [`NormalizationParameters`], keyed by
//! an integer feature id. Trainers use the table to size their input layers and to
//! preprocess raw features.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of a raw feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    /// Real valued feature, standardized with mean and standard deviation.
    Continuous,

    /// 0/1 feature, passed through.
    Binary,

    /// Categorical feature, one-hot encoded over `possible_values`.
    Enum,
}

/// Normalization of a single raw feature.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NormalizationParameters {
    /// Kind of the feature.
    pub feature_type: FeatureType,

    /// Mean of continuous features.
    #[serde(default)]
    pub mean: f32,

    /// Standard deviation of continuous features.
    #[serde(default = "default_stddev")]
    pub stddev: f32,

    /// Values taken by enum features.
    #[serde(default)]
    pub possible_values: Vec<i64>,
}

fn default_stddev() -> f32 {
    1.0
}

impl NormalizationParameters {
    /// Continuous feature.
    pub fn continuous(mean: f32, stddev: f32) -> Self {
        Self {
            feature_type: FeatureType::Continuous,
            mean,
            stddev,
            possible_values: vec![],
        }
    }

    /// Binary feature.
    pub fn binary() -> Self {
        Self {
            feature_type: FeatureType::Binary,
            mean: 0.0,
            stddev: 1.0,
            possible_values: vec![],
        }
    }

    /// Enum feature over the given values.
    pub fn enumeration(possible_values: Vec<i64>) -> Self {
        Self {
            feature_type: FeatureType::Enum,
            mean: 0.0,
            stddev: 1.0,
            possible_values,
        }
    }

    /// Number of values this feature expands to after preprocessing.
    pub fn num_output_features(&self) -> usize {
        match self.feature_type {
            FeatureType::Enum => self.possible_values.len(),
            _ => 1,
        }
    }

    /// Appends the preprocessed value(s) of a raw feature to `out`.
    pub fn preprocess_into(&self, raw: f32, out: &mut Vec<f32>) {
        match self.feature_type {
            FeatureType::Continuous => {
                let stddev = if self.stddev.abs() < f32::EPSILON { 1.0 } else { self.stddev };
                out.push((raw - self.mean) / stddev);
            }
            FeatureType::Binary => out.push(if raw != 0.0 { 1.0 } else { 0.0 }),
            FeatureType::Enum => {
                out.extend(
                    self.possible_values
                        .iter()
                        .map(|v| if *v == raw.round() as i64 { 1.0 } else { 0.0 }),
                );
            }
        }
    }
}

/// Normalization of a set of features, ordered by feature id.
pub type NormalizationTable = BTreeMap<usize, NormalizationParameters>;

/// Number of preprocessed features of a table.
pub fn num_output_features(table: &NormalizationTable) -> usize {
    table.values().map(|p| p.num_output_features()).sum()
}

/// Feature ids present in both tables.
pub fn overlapping_features(a: &NormalizationTable, b: &NormalizationTable) -> Vec<usize> {
    let a: BTreeSet<_> = a.keys().collect();
    b.keys().filter(|k| a.contains(k)).copied().collect()
}

/// Preprocesses raw features, given in feature id order.
///
/// Raw values beyond the length of the table are ignored.
pub fn preprocess(table: &NormalizationTable, raw: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(num_output_features(table));
    for (p, x) in table.values().zip(raw.iter()) {
        p.preprocess_into(*x, &mut out);
    }
    out
}
