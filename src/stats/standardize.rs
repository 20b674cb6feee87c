use crate::error::{PotentialError, Result};
use crate::stats::linalg::column;
use statrs::statistics::Statistics;
use crate::types::series::Metric;
use std::collections::BTreeMap;

/// Repositories (rows) by metrics (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    pub ids: Vec<String>,
    pub metrics: Vec<Metric>,
    pub rows: Vec<Vec<f64>>,
}

impl SampleMatrix {
    pub fn new(ids: Vec<String>, metrics: Vec<Metric>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if ids.len() != rows.len() {
            return Err(PotentialError::InvalidBatch(format!(
                "{} ids for {} rows",
                ids.len(),
                rows.len()
            )));
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != metrics.len())
        {
            return Err(PotentialError::InvalidBatch(format!(
                "row {} ({}) has {} values, expected {}",
                index,
                ids[index],
                row.len(),
                metrics.len()
            )));
        }
        Ok(Self { ids, metrics, rows })
    }

    /// Build from column-oriented data, e.g. `{"activity": [6.01, 0.72, ...]}`.
    /// Rows are named `sample-1`, `sample-2`, ...
    pub fn from_columns(columns: &BTreeMap<Metric, Vec<f64>>, metrics: &[Metric]) -> Result<Self> {
        let height = metrics
            .first()
            .and_then(|metric| columns.get(metric))
            .map(Vec::len)
            .unwrap_or(0);
        let mut rows = vec![Vec::with_capacity(metrics.len()); height];
        for metric in metrics {
            let values = columns.get(metric).ok_or_else(|| {
                PotentialError::InvalidBatch(format!("missing column for metric {metric}"))
            })?;
            if values.len() != height {
                return Err(PotentialError::InvalidBatch(format!(
                    "column {metric} has {} values, expected {height}",
                    values.len()
                )));
            }
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(*value);
            }
        }
        let ids = (1..=height).map(|i| format!("sample-{i}")).collect();
        Self::new(ids, metrics.to_vec(), rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Mean and population deviation; an empty column counts as constant.
fn moments(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    (values.iter().mean(), values.iter().population_std_dev())
}

/// Z-score with the population deviation; a constant column maps to zeros.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let (mu, sigma) = moments(values);
    if sigma == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mu) / sigma).collect()
}

/// Z-score then min-max into [0, 1]; constant columns become 0.5, and
/// `invert` flips the result so that 1.0 is always the favourable end.
pub fn standardize_column(values: &[f64], invert: bool) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let (mu, sigma) = moments(values);
    let z: Vec<f64> = if sigma == 0.0 {
        vec![0.5; values.len()]
    } else {
        values.iter().map(|v| (v - mu) / sigma).collect()
    };

    let min = Statistics::min(z.iter());
    let max = Statistics::max(z.iter());
    let scaled = z.iter().map(|v| if max == min { 0.5 } else { (v - min) / (max - min) });
    if invert {
        scaled.map(|v| 1.0 - v).collect()
    } else {
        scaled.collect()
    }
}

/// Standardise every column against the whole batch.
pub fn standardize(samples: &SampleMatrix, inverted_metrics: &[Metric]) -> Result<SampleMatrix> {
    if samples.is_empty() {
        return Err(PotentialError::DegenerateBatch(
            "cannot standardise an empty batch".to_string(),
        ));
    }
    let mut rows = vec![vec![0.0; samples.metrics.len()]; samples.len()];
    for (j, metric) in samples.metrics.iter().enumerate() {
        let standardized = standardize_column(
            &column(&samples.rows, j),
            inverted_metrics.contains(metric),
        );
        for (row, value) in rows.iter_mut().zip(standardized) {
            row[j] = value;
        }
    }
    SampleMatrix::new(samples.ids.clone(), samples.metrics.clone(), rows)
}
