//! Multi-repository collection: feature records for validation and the
//! forward openrank growth labels they are checked against.

use crate::analyze::features::compute_feature_vector;
use crate::analyze::model::FeatureModel;
use crate::analyze::potential::round_to;
use crate::error::{PotentialError, Result};
use crate::provider::transport::Transport;
use crate::provider::MetricsClient;
use crate::types::config::{BatchSettings, FetchErrorPolicy, WindowSettings};
use crate::types::report::{FeatureRecord, LabelRecord};
use crate::types::series::{Metric, MetricSeries, Month, RepoId};
use crate::window::{observed_months, windowed};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const GROWTH_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discarded {
    pub repo: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome<R> {
    pub records: Vec<R>,
    pub discarded: Vec<Discarded>,
}

impl<R> BatchOutcome<R> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            discarded: Vec::new(),
        }
    }

    /// Record a failed repository, or abort the run under `Propagate`.
    fn reject(&mut self, repo: &str, err: PotentialError, policy: FetchErrorPolicy) -> Result<()> {
        if policy == FetchErrorPolicy::Propagate {
            return Err(err);
        }
        self.discard(repo, err.to_string());
        Ok(())
    }

    fn discard(&mut self, repo: &str, reason: String) {
        warn!(repo, %reason, "discarding repository");
        self.discarded.push(Discarded {
            repo: repo.to_string(),
            reason,
        });
    }
}

/// Feature records for every repository whose full metric set could be
/// fetched and whose window has enough reported months.
pub fn collect_features<T: Transport>(
    client: &MetricsClient<T>,
    repos: &[String],
    model: &FeatureModel,
    window: WindowSettings,
    settings: BatchSettings,
) -> Result<BatchOutcome<FeatureRecord>> {
    let months = window.mode.months(window.months);
    let metrics = model.metrics();
    let mut outcome = BatchOutcome::new();

    for raw in repos {
        let fetched = RepoId::parse(raw).and_then(|repo| client.fetch_all(&repo, &metrics));
        let series = match fetched {
            Ok(series) => series,
            Err(err) => {
                outcome.reject(raw, err, settings.on_fetch_error)?;
                continue;
            }
        };

        if let Some((metric, seen)) = sparsest(&series, &months) {
            if seen < settings.min_observed_months {
                outcome.discard(
                    raw,
                    format!(
                        "{metric} has {seen} of {} months reported (minimum {})",
                        months.len(),
                        settings.min_observed_months
                    ),
                );
                continue;
            }
        }

        let features = compute_feature_vector(model, &windowed(&series, &months));
        info!(repo = %raw, "collected features");
        outcome.records.push(FeatureRecord {
            repo: raw.trim().to_string(),
            features,
        });
    }
    Ok(outcome)
}

fn sparsest(series: &BTreeMap<Metric, MetricSeries>, months: &[Month]) -> Option<(Metric, usize)> {
    series
        .iter()
        .map(|(metric, values)| (*metric, observed_months(values, months)))
        .min_by_key(|(_, seen)| *seen)
}

/// Relative openrank change from `eval` to `eval + horizon` months; `None`
/// when either month is missing from the series.
pub fn growth_label(
    repo: &str,
    openrank: &MetricSeries,
    eval: Month,
    horizon: u32,
) -> Option<LabelRecord> {
    let now = *openrank.get(&eval)?;
    let later = *openrank.get(&eval.offset(i32::try_from(horizon).ok()?))?;
    let y_growth = (later - now) / now.max(GROWTH_EPSILON);
    Some(LabelRecord {
        repo: repo.to_string(),
        t: eval,
        openrank_t: round_to(now, 4),
        openrank_t_plus_3: round_to(later, 4),
        y_growth: round_to(y_growth, 6),
    })
}

/// Extend `cached` with labels for repositories it does not cover yet.
pub fn build_labels<T: Transport>(
    client: &MetricsClient<T>,
    repos: &[String],
    eval: Month,
    horizon: u32,
    cached: Vec<LabelRecord>,
    policy: FetchErrorPolicy,
) -> Result<BatchOutcome<LabelRecord>> {
    let known: BTreeSet<String> = cached.iter().map(|label| label.repo.clone()).collect();
    let mut outcome = BatchOutcome::new();
    outcome.records = cached;

    for raw in repos.iter().filter(|repo| !known.contains(repo.trim())) {
        let series = match client.fetch(raw, Metric::Openrank) {
            Ok(series) => series,
            Err(err) => {
                outcome.reject(raw, err, policy)?;
                continue;
            }
        };
        match growth_label(raw.trim(), &series, eval, horizon) {
            Some(label) => {
                info!(repo = %raw, y_growth = label.y_growth, "labelled repository");
                outcome.records.push(label);
            }
            None => outcome.discard(
                raw,
                format!("openrank missing at {eval} or {horizon} months later"),
            ),
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::StubTransport;
    use crate::provider::DEFAULT_BASE_URL;
    use crate::window::WindowMode;

    fn month(raw: &str) -> Month {
        raw.parse().expect("month should parse")
    }

    fn series_json(values: &[f64]) -> String {
        let entries: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("\"2025-{:02}\": {v}", i + 1))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    fn with_repo(stub: StubTransport, repo: &str, activity: &[f64]) -> StubTransport {
        let flat = series_json(&[3.0; 6]);
        ["participants", "contributors", "bus_factor", "openrank", "issue_response_time"]
            .iter()
            .fold(stub.with_json(repo, "activity", &series_json(activity)), |stub, metric| {
                stub.with_json(repo, metric, &flat)
            })
    }

    fn june_window() -> WindowSettings {
        WindowSettings {
            months: 6,
            mode: WindowMode::EndingAt(month("2025-06")),
        }
    }

    fn repos(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn failing_repository_is_excluded_without_affecting_others() {
        let stub = with_repo(StubTransport::new(), "a/one", &[1.0, 1.0, 1.0, 1.0, 1.0, 2.0]);
        let stub = with_repo(stub, "c/three", &[4.0, 4.0, 4.0, 4.0, 4.0, 2.0]);
        let client = MetricsClient::new(DEFAULT_BASE_URL, stub);
        let model = FeatureModel::canonical();

        let outcome = collect_features(
            &client,
            &repos(&["a/one", "b/missing", "c/three"]),
            &model,
            june_window(),
            BatchSettings::default(),
        )
        .expect("discard policy never aborts");

        let names: Vec<&str> = outcome.records.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, vec!["a/one", "c/three"]);
        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(outcome.discarded[0].repo, "b/missing");
        assert!(outcome.discarded[0].reason.contains("404"));

        let alone = collect_features(
            &client,
            &repos(&["c/three"]),
            &model,
            june_window(),
            BatchSettings::default(),
        )
        .expect("single repo batch");
        assert_eq!(alone.records[0], outcome.records[1]);
    }

    #[test]
    fn propagate_policy_aborts_on_first_failure() {
        let client = MetricsClient::new(DEFAULT_BASE_URL, StubTransport::new());
        let settings = BatchSettings {
            on_fetch_error: FetchErrorPolicy::Propagate,
            ..BatchSettings::default()
        };
        let result = collect_features(
            &client,
            &repos(&["b/missing"]),
            &FeatureModel::canonical(),
            june_window(),
            settings,
        );
        assert!(matches!(result, Err(PotentialError::FetchFailed { .. })));
    }

    #[test]
    fn invalid_identifier_is_discarded_in_batch_mode() {
        let client = MetricsClient::new(DEFAULT_BASE_URL, StubTransport::new());
        let outcome = collect_features(
            &client,
            &repos(&["not-a-repo"]),
            &FeatureModel::canonical(),
            june_window(),
            BatchSettings::default(),
        )
        .expect("discarded, not failed");
        assert!(outcome.records.is_empty());
        assert!(outcome.discarded[0].reason.contains("invalid repo format"));
        assert_eq!(client_calls(&client), 0);
    }

    fn client_calls(client: &MetricsClient<StubTransport>) -> usize {
        client.transport().calls.get()
    }

    #[test]
    fn sparse_repository_is_discarded() {
        let stub = with_repo(StubTransport::new(), "a/sparse", &[1.0, 2.0]);
        let sparse_activity = r#"{"2025-06": 9.0}"#;
        let stub = stub.with_json("a/sparse", "activity", sparse_activity);
        let client = MetricsClient::new(DEFAULT_BASE_URL, stub);
        let outcome = collect_features(
            &client,
            &repos(&["a/sparse"]),
            &FeatureModel::canonical(),
            june_window(),
            BatchSettings::default(),
        )
        .expect("batch");
        assert!(outcome.records.is_empty());
        assert!(outcome.discarded[0].reason.starts_with("activity has 1 of 6"));
    }

    #[test]
    fn growth_label_is_relative_openrank_change() {
        let mut series = MetricSeries::new();
        series.insert(month("2025-06"), 2.0);
        series.insert(month("2025-09"), 3.123456789);
        let label = growth_label("a/b", &series, month("2025-06"), 3).expect("both months present");
        assert_eq!(label.t, month("2025-06"));
        assert_eq!(label.openrank_t, 2.0);
        assert_eq!(label.openrank_t_plus_3, 3.1235);
        assert_eq!(label.y_growth, 0.561728);

        series.insert(month("2025-06"), 0.0);
        let label = growth_label("a/b", &series, month("2025-06"), 3).expect("zero base");
        assert!(label.y_growth > 1e6);

        assert!(growth_label("a/b", &series, month("2025-07"), 3).is_none());
    }

    #[test]
    fn oversized_horizon_never_wraps_to_an_earlier_month() {
        let mut series = MetricSeries::new();
        series.insert(month("2025-05"), 4.0);
        series.insert(month("2025-06"), 2.0);
        assert!(growth_label("a/b", &series, month("2025-06"), u32::MAX).is_none());
    }

    #[test]
    fn labels_skip_cached_repositories() {
        let stub = StubTransport::new().with_json(
            "b/new",
            "openrank",
            r#"{"2025-06": 1.0, "2025-09": 1.5, "2025Q3": 9.0}"#,
        );
        let client = MetricsClient::new(DEFAULT_BASE_URL, stub);
        let cached = vec![LabelRecord {
            repo: "a/cached".to_string(),
            t: month("2025-06"),
            openrank_t: 1.0,
            openrank_t_plus_3: 1.0,
            y_growth: 0.0,
        }];
        let outcome = build_labels(
            &client,
            &repos(&["a/cached", "b/new", "c/gone"]),
            month("2025-06"),
            3,
            cached,
            FetchErrorPolicy::Discard,
        )
        .expect("labels");

        let names: Vec<&str> = outcome.records.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, vec!["a/cached", "b/new"]);
        assert_eq!(outcome.records[1].y_growth, 0.5);
        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(client_calls(&client), 2);
    }
}
