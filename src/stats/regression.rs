//! Correlation and least-squares checks of feature vectors against the
//! forward growth label.

use crate::error::{PotentialError, Result};
use crate::stats::distribution::student_t_two_sided;
use crate::stats::linalg::{column, dot, solve_symmetric_pinv};
use crate::stats::standardize::zscore;
use crate::types::report::{FeatureRecord, LabelRecord};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const DEFAULT_MIN_COMMON_REPOS: usize = 5;

/// Repositories present in both the feature and label sets, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSamples {
    pub repos: Vec<String>,
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl JoinedSamples {
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|f| f == name)
    }

    fn without_feature(&self, index: usize) -> Self {
        let mut reduced = self.clone();
        reduced.feature_names.remove(index);
        reduced.rows.iter_mut().for_each(|row| {
            row.remove(index);
        });
        reduced
    }
}

/// Inner join on repository name. Feature columns are the union of every
/// joined record's keys; a key missing from one record counts as 0.
pub fn join(features: &[FeatureRecord], labels: &[LabelRecord]) -> Result<JoinedSamples> {
    let labels: BTreeMap<&str, f64> = labels
        .iter()
        .map(|label| (label.repo.as_str(), label.y_growth))
        .collect();
    let matched: BTreeMap<&str, &FeatureRecord> = features
        .iter()
        .filter(|record| labels.contains_key(record.repo.as_str()))
        .map(|record| (record.repo.as_str(), record))
        .collect();
    if matched.is_empty() {
        return Err(PotentialError::DegenerateBatch(
            "no repository appears in both the feature and label sets".to_string(),
        ));
    }

    let feature_names: Vec<String> = matched
        .values()
        .flat_map(|record| record.features.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows = matched
        .values()
        .map(|record| {
            feature_names
                .iter()
                .map(|name| record.features.get(name).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(JoinedSamples {
        repos: matched.keys().map(|repo| repo.to_string()).collect(),
        feature_names,
        rows,
        labels: matched.keys().map(|repo| labels[repo]).collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub feature: String,
    pub r: f64,
    pub p_value: f64,
}

/// Pearson's r with its two-sided p-value. Fewer than two samples or a
/// constant series gives `r = 0, p = 1`.
pub fn pearson(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = std::cmp::min(x.len(), y.len());
    if n < 2 {
        return (0.0, 1.0);
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (var_x, var_y) = (x.iter().variance(), y.iter().variance());
    if var_x == 0.0 || var_y == 0.0 {
        return (0.0, 1.0);
    }
    let r = (x.iter().covariance(y.iter()) / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    if n == 2 {
        return (r, 1.0);
    }
    let df = (n - 2) as f64;
    let p = if r.abs() >= 1.0 {
        0.0
    } else {
        student_t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)
    };
    (r, p)
}

pub fn correlate(samples: &JoinedSamples) -> Vec<Correlation> {
    samples
        .feature_names
        .iter()
        .enumerate()
        .map(|(j, feature)| {
            let (r, p_value) = pearson(&zscore(&column(&samples.rows, j)), &samples.labels);
            Correlation {
                feature: feature.clone(),
                r,
                p_value,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub samples: usize,
    /// Sorted by absolute weight, largest first.
    pub weights: Vec<FeatureWeight>,
    pub intercept: f64,
    pub r_squared: f64,
}

impl FitReport {
    pub fn weight(&self, feature: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.feature == feature)
            .map(|w| w.weight)
    }
}

/// Ordinary least squares on z-scored features with an intercept.
pub fn fit_linear(samples: &JoinedSamples) -> FitReport {
    let width = samples.feature_names.len();
    let columns: Vec<Vec<f64>> = (0..width)
        .map(|j| zscore(&column(&samples.rows, j)))
        .collect();
    let y_mean = if samples.is_empty() {
        0.0
    } else {
        samples.labels.iter().mean()
    };
    let centered: Vec<f64> = samples.labels.iter().map(|y| y - y_mean).collect();

    let gram: Vec<Vec<f64>> = columns
        .iter()
        .map(|a| columns.iter().map(|b| dot(a, b)).collect())
        .collect();
    let rhs: Vec<f64> = columns.iter().map(|c| dot(c, &centered)).collect();
    let beta = solve_symmetric_pinv(&gram, &rhs);

    let ss_res: f64 = (0..samples.len())
        .map(|i| {
            let predicted: f64 = columns.iter().zip(&beta).map(|(c, b)| c[i] * b).sum();
            (centered[i] - predicted).powi(2)
        })
        .sum();
    let ss_tot: f64 = centered.iter().map(|y| y * y).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res < 1e-12 {
        1.0
    } else {
        0.0
    };

    let mut weights: Vec<FeatureWeight> = samples
        .feature_names
        .iter()
        .zip(beta)
        .map(|(feature, weight)| FeatureWeight {
            feature: feature.clone(),
            weight,
        })
        .collect();
    weights.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

    FitReport {
        samples: samples.len(),
        weights,
        intercept: y_mean,
        r_squared,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightShift {
    pub feature: String,
    pub with_candidate: f64,
    pub without_candidate: f64,
    pub shift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
    pub candidate: String,
    pub with_candidate: FitReport,
    pub without_candidate: FitReport,
    pub r_squared_delta: f64,
    pub weight_shifts: Vec<WeightShift>,
}

/// Fit once with every feature and once without `candidate`.
pub fn compare_models(samples: &JoinedSamples, candidate: &str) -> Result<ModelComparison> {
    let index = samples.feature_index(candidate).ok_or_else(|| {
        PotentialError::InvalidBatch(format!("candidate feature '{candidate}' is not in the feature set"))
    })?;
    let with_candidate = fit_linear(samples);
    let without_candidate = fit_linear(&samples.without_feature(index));

    let weight_shifts = without_candidate
        .weights
        .iter()
        .map(|reduced| {
            let full = with_candidate.weight(&reduced.feature).unwrap_or(0.0);
            WeightShift {
                feature: reduced.feature.clone(),
                with_candidate: full,
                without_candidate: reduced.weight,
                shift: reduced.weight - full,
            }
        })
        .collect();

    Ok(ModelComparison {
        candidate: candidate.to_string(),
        r_squared_delta: with_candidate.r_squared - without_candidate.r_squared,
        with_candidate,
        without_candidate,
        weight_shifts,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub common_repos: usize,
    pub low_confidence: bool,
    pub correlations: Vec<Correlation>,
    pub fit: FitReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ModelComparison>,
}

/// Join, correlate, fit, and optionally compare against a model without
/// `candidate`. Too few common repositories only marks the result.
pub fn validate(
    features: &[FeatureRecord],
    labels: &[LabelRecord],
    candidate: Option<&str>,
    min_common_repos: usize,
) -> Result<ValidationReport> {
    let samples = join(features, labels)?;
    let low_confidence = samples.len() < min_common_repos;
    if low_confidence {
        warn!(
            common = samples.len(),
            required = min_common_repos,
            "too few common repositories; results are statistically unreliable"
        );
    }

    let correlations = correlate(&samples);
    let fit = fit_linear(&samples);
    let comparison = candidate
        .map(|name| compare_models(&samples, name))
        .transpose()?;
    info!(
        common = samples.len(),
        r_squared = fit.r_squared,
        "validated feature model against growth labels"
    );

    Ok(ValidationReport {
        common_repos: samples.len(),
        low_confidence,
        correlations,
        fit,
        comparison,
    })
}
