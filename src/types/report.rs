use crate::types::scoring::{FeatureVector, Score};
use crate::types::series::{Metric, Month, RepoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The single-repository response.
#[derive(Debug, Clone, Serialize)]
pub struct PotentialReport {
    pub repo: RepoId,
    pub model: String,
    pub potential: Score,
    pub features: FeatureVector,
    pub months: Vec<Month>,
    pub raw_series: BTreeMap<Metric, Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<Vec<Option<Score>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub averages: Option<BTreeMap<Metric, f64>>,
}

/// One row of a cached feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub repo: String,
    pub features: FeatureVector,
}

/// One row of a cached forward-growth label file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub repo: String,
    pub t: Month,
    pub openrank_t: f64,
    pub openrank_t_plus_3: f64,
    pub y_growth: f64,
}
