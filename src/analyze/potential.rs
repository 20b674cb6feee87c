use crate::analyze::features::compute_feature_vector;
use crate::analyze::model::FeatureModel;
use crate::types::scoring::{FeatureVector, Score, WeightVector};
use crate::types::series::WindowedMetrics;

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// `(round(Σ weight·feature, 4) + 1) × 100`. Features without a value count as 0.
pub fn score(features: &FeatureVector, weights: &WeightVector) -> Score {
    let weighted: f64 = weights
        .iter()
        .map(|(name, weight)| weight * features.get(name).copied().unwrap_or(0.0))
        .sum();
    (round_to(weighted, 4) + 1.0) * 100.0
}

/// Score every prefix of the window listed in `window_lengths`. A prefix of
/// fewer than two months cannot carry a trend, so its entry is `None`.
pub fn score_series(
    model: &FeatureModel,
    detailed: &WindowedMetrics,
    window_lengths: &[usize],
) -> Vec<Option<Score>> {
    window_lengths
        .iter()
        .map(|&length| {
            if length < 2 {
                return None;
            }
            let features = compute_feature_vector(model, &detailed.prefix(length));
            Some(score(&features, &model.weights))
        })
        .collect()
}

/// Checkpoints 1..=n for a window of n months.
pub fn checkpoints(window_len: usize) -> Vec<usize> {
    (1..=window_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::series::{Metric, Month};

    fn weights(entries: &[(&str, f64)]) -> WeightVector {
        entries
            .iter()
            .map(|(name, weight)| (name.to_string(), *weight))
            .collect()
    }

    fn six_month_window() -> WindowedMetrics {
        let months: Vec<Month> = (1..=6)
            .map(|m| Month::new(2025, m).expect("valid month"))
            .collect();
        let mut windowed = WindowedMetrics::new(months);
        windowed.insert(Metric::Activity, vec![1.0, 2.0, 3.0, 4.0, 5.0, 10.0]);
        windowed.insert(Metric::IssueResponseTime, vec![5.0, 5.0, 5.0, 5.0, 5.0, 2.0]);
        windowed
    }

    #[test]
    fn score_of_no_features_is_one_hundred() {
        let weights = FeatureModel::canonical().weights;
        assert_eq!(score(&FeatureVector::new(), &weights), 100.0);
    }

    #[test]
    fn score_rounds_weighted_sum_to_four_places() {
        let mut features = FeatureVector::new();
        features.insert("activity_trend".to_string(), 0.123456);
        let value = score(&features, &weights(&[("activity_trend", 1.0)]));
        assert!((value - 112.35).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn score_is_deterministic() {
        let mut features = FeatureVector::new();
        features.insert("activity_trend".to_string(), 0.37);
        features.insert("bus_factor_jump".to_string(), 1.0);
        let weights = FeatureModel::canonical().weights;
        assert_eq!(
            score(&features, &weights).to_bits(),
            score(&features, &weights).to_bits()
        );
    }

    #[test]
    fn end_to_end_two_feature_score() {
        let model = FeatureModel::canonical();
        let features = compute_feature_vector(&model, &six_month_window());
        let weights = weights(&[
            ("activity_trend", 0.6717),
            ("issue_response_time_trend", 0.1356),
        ]);
        // 0.6717 * 8.999991 + 0.1356 * 0.59999988 = 6.12665..., rounded to 6.1267
        let value = score(&features, &weights);
        assert!((value - 712.67).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn score_series_marks_first_checkpoint_undefined() {
        let model = FeatureModel::canonical();
        let detailed = six_month_window();
        let series = score_series(&model, &detailed, &checkpoints(detailed.len()));

        assert_eq!(series.len(), 6);
        assert!(series[0].is_none());
        assert!(series[1..].iter().all(|value| value.map(f64::is_finite).unwrap_or(false)));
        let full = score(&compute_feature_vector(&model, &detailed), &model.weights);
        assert_eq!(series[5], Some(full));
    }

    #[test]
    fn score_series_tolerates_lengths_past_the_window() {
        let model = FeatureModel::canonical();
        let detailed = six_month_window();
        let series = score_series(&model, &detailed, &[0, 2, 9]);
        assert_eq!(series.len(), 3);
        assert!(series[0].is_none());
        assert!(series[2].is_some());
    }
}
