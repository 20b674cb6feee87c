use crate::error::{PotentialError, Result};
use crate::stats::linalg::{column_means, covariance, dot, symmetric_eigen};
use crate::stats::standardize::{standardize, SampleMatrix};
use crate::types::series::Metric;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const RATIO_TOLERANCE: f64 = 1e-12;

/// How many principal components to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Components {
    All,
    Count(usize),
    /// Smallest count whose cumulative explained-variance ratio reaches the value.
    VarianceRatio(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcaFit {
    pub means: Vec<f64>,
    /// `axes[k]` is the unit direction of component `k` in metric space.
    pub axes: Vec<Vec<f64>>,
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
}

impl PcaFit {
    pub fn fit(rows: &[Vec<f64>], width: usize, selection: Components) -> Self {
        let eigen = symmetric_eigen(&covariance(rows, width));
        let variances: Vec<f64> = eigen.values.iter().map(|v| v.max(0.0)).collect();
        let total: f64 = variances.iter().sum();
        let ratios: Vec<f64> = variances
            .iter()
            .map(|v| if total > 0.0 { v / total } else { 0.0 })
            .collect();

        let cap = rows.len().clamp(1, width.max(1)).min(width);
        let keep = match selection {
            Components::All => cap,
            Components::Count(count) => count.clamp(1, cap.max(1)).min(cap),
            Components::VarianceRatio(target) => {
                let mut cumulative = 0.0;
                ratios
                    .iter()
                    .take(cap)
                    .position(|ratio| {
                        cumulative += ratio;
                        cumulative + RATIO_TOLERANCE >= target
                    })
                    .map(|index| index + 1)
                    .unwrap_or(cap)
            }
        };

        Self {
            means: column_means(rows, width),
            axes: eigen.vectors.into_iter().take(keep).collect(),
            explained_variance: variances.into_iter().take(keep).collect(),
            explained_variance_ratio: ratios.into_iter().take(keep).collect(),
        }
    }

    pub fn n_components(&self) -> usize {
        self.axes.len()
    }

    /// Project one sample into component space.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        let centered: Vec<f64> = row.iter().zip(&self.means).map(|(x, m)| x - m).collect();
        self.axes.iter().map(|axis| dot(axis, &centered)).collect()
    }

    /// Variance-ratio-weighted sum of a sample's component scores.
    pub fn composite(&self, row: &[f64]) -> f64 {
        dot(&self.transform(row), &self.explained_variance_ratio)
    }

    /// `loadings()[k][j]`: component `k` axis scaled by the square root of its variance.
    pub fn loadings(&self) -> Vec<Vec<f64>> {
        self.axes
            .iter()
            .zip(&self.explained_variance)
            .map(|(axis, variance)| axis.iter().map(|a| a * variance.sqrt()).collect())
            .collect()
    }

    /// Per-metric importance normalised to sum to one; uniform when every
    /// weighted loading is zero.
    pub fn metric_weights(&self, width: usize) -> Vec<f64> {
        let loadings = self.loadings();
        let raw: Vec<f64> = (0..width)
            .map(|j| {
                loadings
                    .iter()
                    .zip(&self.explained_variance_ratio)
                    .map(|(loading, ratio)| loading[j].abs() * ratio)
                    .sum()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        if total == 0.0 || !total.is_finite() {
            return vec![1.0 / width.max(1) as f64; width];
        }
        raw.into_iter().map(|w| w / total).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleScore {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightDerivation {
    pub samples: usize,
    pub n_components: usize,
    pub weights: BTreeMap<Metric, f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub eigenvalues: Vec<f64>,
    pub loadings: Vec<BTreeMap<Metric, f64>>,
    pub dominant_metrics: Vec<Metric>,
    pub composite_scores: Vec<SampleScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<SampleScore>,
}

fn derive(
    standardized: &SampleMatrix,
    selection: Components,
    baseline: Option<usize>,
) -> Result<WeightDerivation> {
    if standardized.is_empty() || standardized.metrics.is_empty() {
        return Err(PotentialError::DegenerateBatch(
            "weight derivation needs at least one sample and one metric".to_string(),
        ));
    }
    let width = standardized.metrics.len();
    let fit = PcaFit::fit(&standardized.rows, width, selection);

    let weights = standardized
        .metrics
        .iter()
        .copied()
        .zip(fit.metric_weights(width))
        .collect();
    let loading_rows = fit.loadings();
    let dominant_metrics = loading_rows
        .iter()
        .map(|loading| {
            let index = loading
                .iter()
                .enumerate()
                .fold(0, |best, (j, value)| if value.abs() > loading[best].abs() { j } else { best });
            standardized.metrics[index]
        })
        .collect();
    let loadings = loading_rows
        .iter()
        .map(|loading| standardized.metrics.iter().copied().zip(loading.iter().copied()).collect())
        .collect();

    let score_of = |index: usize| SampleScore {
        id: standardized.ids[index].clone(),
        score: fit.composite(&standardized.rows[index]),
    };
    let composite_scores = (0..standardized.len())
        .filter(|index| Some(*index) != baseline)
        .map(score_of)
        .collect();

    info!(
        samples = standardized.len(),
        components = fit.n_components(),
        "derived metric weights"
    );

    Ok(WeightDerivation {
        samples: standardized.len(),
        n_components: fit.n_components(),
        weights,
        explained_variance_ratio: fit.explained_variance_ratio.clone(),
        eigenvalues: fit.explained_variance.clone(),
        loadings,
        dominant_metrics,
        composite_scores,
        baseline: baseline.map(score_of),
    })
}

/// PCA importance weights over an already standardised batch.
pub fn derive_weights(standardized: &SampleMatrix, selection: Components) -> Result<WeightDerivation> {
    derive(standardized, selection, None)
}

/// Standardise the raw batch including the baseline row, fit on every row,
/// and score the baseline separately from the other samples.
pub fn derive_weights_with_baseline(
    raw: &SampleMatrix,
    inverted_metrics: &[Metric],
    baseline: usize,
    selection: Components,
) -> Result<WeightDerivation> {
    if baseline >= raw.len() {
        return Err(PotentialError::InvalidBatch(format!(
            "baseline row {baseline} is out of range for {} samples",
            raw.len()
        )));
    }
    let standardized = standardize(raw, inverted_metrics)?;
    derive(&standardized, selection, Some(baseline))
}
