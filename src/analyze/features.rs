use crate::analyze::model::{FeatureModel, Transform};
use crate::types::scoring::FeatureVector;
use crate::types::series::WindowedMetrics;

pub const TREND_EPSILON: f64 = 1e-6;

/// Signed relative change `(last - first) / (|first| + ε)`; 0.0 below two points.
pub fn trend(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => (last - first) / (first.abs() + TREND_EPSILON),
        _ => 0.0,
    }
}

/// 1.0 iff the first value is at or below `threshold` and the last is above it.
pub fn jump(values: &[f64], threshold: f64) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && *first <= threshold && *last > threshold => 1.0,
        _ => 0.0,
    }
}

/// 1.0 iff the last value exceeds the first.
pub fn increase(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && last > first => 1.0,
        _ => 0.0,
    }
}

pub fn apply(transform: Transform, values: &[f64]) -> f64 {
    match transform {
        Transform::Trend => trend(values),
        Transform::NegatedTrend => -trend(values),
        Transform::Jump { threshold } => jump(values, threshold),
        Transform::Increase => increase(values),
    }
}

pub fn compute_feature_vector(model: &FeatureModel, windowed: &WindowedMetrics) -> FeatureVector {
    model
        .features
        .iter()
        .map(|spec| {
            let value = apply(spec.transform, windowed.get(spec.metric));
            (spec.name.to_string(), value)
        })
        .collect()
}
