use crate::types::series::{Metric, MetricSeries, Month, WindowedMetrics};
use std::collections::BTreeMap;

/// How the evaluation window is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// N months ending at (and including) a fixed month.
    EndingAt(Month),
    /// N full months strictly before the current calendar month.
    TrailingFullMonths,
}

impl WindowMode {
    pub fn months(self, n: usize) -> Vec<Month> {
        match self {
            Self::EndingAt(end) => select_window(end, n),
            Self::TrailingFullMonths => trailing_window(Month::current(), n),
        }
    }
}

/// `n` consecutive calendar months ending at `end`, oldest first.
pub fn select_window(end: Month, n: usize) -> Vec<Month> {
    (0..n)
        .rev()
        .map(|back| end.offset(-i32::try_from(back).unwrap_or(i32::MAX)))
        .collect()
}

/// `n` consecutive months ending the month before `now`.
pub fn trailing_window(now: Month, n: usize) -> Vec<Month> {
    select_window(now.pred(), n)
}

/// Values of `series` at each month, 0.0 where the provider has no data.
pub fn project(series: &MetricSeries, months: &[Month]) -> Vec<f64> {
    months
        .iter()
        .map(|month| series.get(month).copied().unwrap_or(0.0))
        .collect()
}

/// Number of months in the window the provider actually reported.
pub fn observed_months(series: &MetricSeries, months: &[Month]) -> usize {
    months.iter().filter(|month| series.contains_key(month)).count()
}

pub fn windowed(series: &BTreeMap<Metric, MetricSeries>, months: &[Month]) -> WindowedMetrics {
    let mut windowed = WindowedMetrics::new(months.to_vec());
    for (metric, values) in series {
        windowed.insert(*metric, project(values, months));
    }
    windowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(raw: &str) -> Month {
        raw.parse().expect("month should parse")
    }

    #[test]
    fn window_length_is_never_truncated() {
        let months = select_window(month("2025-06"), 120);
        assert_eq!(months.len(), 120);
        assert_eq!(months[0], month("2015-07"));
        assert_eq!(months[119], month("2025-06"));
    }

    #[test]
    fn select_window_wraps_year_boundary() {
        let months = select_window(month("2025-01"), 3);
        let rendered: Vec<String> = months.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["2024-11", "2024-12", "2025-01"]);
    }

    #[test]
    fn select_window_of_zero_is_empty() {
        assert!(select_window(month("2025-06"), 0).is_empty());
    }

    #[test]
    fn trailing_window_excludes_current_month() {
        let months = trailing_window(month("2025-03"), 2);
        assert_eq!(months, vec![month("2025-01"), month("2025-02")]);
    }

    #[test]
    fn project_substitutes_zero_for_missing_months() {
        let mut series = MetricSeries::new();
        series.insert(month("2025-01"), 4.0);
        series.insert(month("2025-03"), 6.5);
        series.insert(month("2024-06"), 99.0);

        let months = select_window(month("2025-03"), 3);
        assert_eq!(project(&series, &months), vec![4.0, 0.0, 6.5]);
        assert_eq!(observed_months(&series, &months), 2);
    }

    #[test]
    fn windowed_projects_every_metric() {
        let mut activity = MetricSeries::new();
        activity.insert(month("2025-02"), 3.0);
        let mut series = BTreeMap::new();
        series.insert(Metric::Activity, activity);
        series.insert(Metric::Openrank, MetricSeries::new());

        let months = select_window(month("2025-02"), 2);
        let windowed = windowed(&series, &months);
        assert_eq!(windowed.get(Metric::Activity), &[0.0, 3.0]);
        assert_eq!(windowed.get(Metric::Openrank), &[0.0, 0.0]);
    }
}
