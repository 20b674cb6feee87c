//! Versioned feature tables and weight presets.
//!
//! A model pairs the feature definitions (which metric, which transform) with
//! the weights that were calibrated against exactly those definitions. Older
//! calibrations stay available as named presets instead of separate code paths.

use crate::error::{PotentialError, Result};
use crate::types::series::Metric;
use std::collections::BTreeMap;

pub const DEFAULT_JUMP_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Relative change, first to last.
    Trend,
    /// Relative change with the sign flipped, for lower-is-better metrics.
    NegatedTrend,
    /// 1 when the series crosses from at-or-below `threshold` to above it.
    Jump { threshold: f64 },
    /// 1 when the last value exceeds the first.
    Increase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub metric: Metric,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureModel {
    pub version: &'static str,
    pub features: Vec<FeatureSpec>,
    pub weights: BTreeMap<String, f64>,
}

impl FeatureModel {
    /// The model served by default.
    pub fn canonical() -> Self {
        Self::opendigger_v2()
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "opendigger-v2" => Ok(Self::opendigger_v2()),
            "opendigger-v2-no-openrank" => Ok(Self::opendigger_v2_no_openrank()),
            "opendigger-v2-increase" => Ok(Self::opendigger_v2_increase()),
            other => Err(PotentialError::ConfigParse(format!(
                "unknown model preset: {other} (expected one of: {})",
                Self::PRESETS.join(", ")
            ))),
        }
    }

    pub const PRESETS: [&'static str; 3] = [
        "opendigger-v2",
        "opendigger-v2-no-openrank",
        "opendigger-v2-increase",
    ];

    fn opendigger_v2() -> Self {
        let features = vec![
            FeatureSpec {
                name: "activity_trend",
                metric: Metric::Activity,
                transform: Transform::Trend,
            },
            FeatureSpec {
                name: "participants_trend",
                metric: Metric::Participants,
                transform: Transform::Trend,
            },
            FeatureSpec {
                name: "openrank_trend",
                metric: Metric::Openrank,
                transform: Transform::Trend,
            },
            FeatureSpec {
                name: "contributors_jump",
                metric: Metric::Contributors,
                transform: Transform::Jump {
                    threshold: DEFAULT_JUMP_THRESHOLD,
                },
            },
            FeatureSpec {
                name: "bus_factor_jump",
                metric: Metric::BusFactor,
                transform: Transform::Jump {
                    threshold: DEFAULT_JUMP_THRESHOLD,
                },
            },
            FeatureSpec {
                name: "issue_response_time_trend",
                metric: Metric::IssueResponseTime,
                transform: Transform::NegatedTrend,
            },
        ];
        let weights = [
            ("activity_trend", 0.6717),
            ("participants_trend", -0.2348),
            ("bus_factor_jump", 0.1755),
            ("issue_response_time_trend", 0.1356),
            ("contributors_jump", 0.0100),
            ("openrank_trend", 0.2),
        ];
        Self {
            version: "opendigger-v2",
            features,
            weights: weights
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        }
    }

    fn opendigger_v2_no_openrank() -> Self {
        let mut model = Self::opendigger_v2();
        model.version = "opendigger-v2-no-openrank";
        model.features.retain(|spec| spec.name != "openrank_trend");
        model.weights.remove("openrank_trend");
        model
    }

    /// Same weights, but the jump features fire on any rise between the
    /// first and last month instead of a threshold crossing.
    fn opendigger_v2_increase() -> Self {
        let mut model = Self::opendigger_v2();
        model.version = "opendigger-v2-increase";
        for spec in &mut model.features {
            if let Transform::Jump { .. } = spec.transform {
                spec.transform = Transform::Increase;
            }
        }
        model
    }

    /// Distinct metrics the feature table reads, in table order.
    pub fn metrics(&self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        for spec in &self.features {
            if !metrics.contains(&spec.metric) {
                metrics.push(spec.metric);
            }
        }
        metrics
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.features.iter().map(|spec| spec.name).collect()
    }

    /// Replace individual weights; unknown feature names are rejected.
    pub fn with_weight_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Result<Self> {
        let names = self.feature_names();
        for (name, weight) in overrides {
            if !names.contains(&name.as_str()) {
                return Err(PotentialError::ConfigParse(format!(
                    "model.weights contains unknown feature: {name}"
                )));
            }
            if !weight.is_finite() {
                return Err(PotentialError::ConfigParse(format!(
                    "model.weights.{name} must be finite"
                )));
            }
            self.weights.insert(name.clone(), *weight);
        }
        Ok(self)
    }
}
