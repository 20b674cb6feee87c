pub mod features;
pub mod model;
pub mod potential;

use crate::error::Result;
use crate::provider::transport::Transport;
use crate::provider::MetricsClient;
use crate::types::config::WindowSettings;
use crate::types::report::PotentialReport;
use crate::types::series::RepoId;
use crate::window::windowed;
use features::compute_feature_vector;
use model::FeatureModel;
use potential::{checkpoints, round_to, score, score_series};
use tracing::info;

/// Optional sections of the single-repository report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub checkpoints: bool,
    pub averages: bool,
}

/// Fetch, window, extract and score one repository. Any fetch failure fails
/// the whole request; no partial score is produced.
pub fn analyze_repo<T: Transport>(
    client: &MetricsClient<T>,
    repo: &str,
    model: &FeatureModel,
    window: WindowSettings,
    options: AnalyzeOptions,
) -> Result<PotentialReport> {
    let repo = RepoId::parse(repo)?;
    let months = window.mode.months(window.months);
    let series = client.fetch_all(&repo, &model.metrics())?;
    let detailed = windowed(&series, &months);

    let features = compute_feature_vector(model, &detailed);
    let potential = round_to(score(&features, &model.weights), 4);
    info!(%repo, model = model.version, potential, "scored repository");

    Ok(PotentialReport {
        model: model.version.to_string(),
        potential,
        features,
        months,
        checkpoints: options
            .checkpoints
            .then(|| score_series(model, &detailed, &checkpoints(detailed.len()))),
        averages: options.averages.then(|| detailed.averages()),
        raw_series: detailed.values,
        repo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PotentialError;
    use crate::provider::testing::StubTransport;
    use crate::provider::DEFAULT_BASE_URL;
    use crate::types::series::{Metric, Month};
    use crate::window::WindowMode;

    const REPO: &str = "octocat/Hello-World";

    fn series_json(values: &[f64]) -> String {
        let entries: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("\"2025-{:02}\": {v}", i + 1))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    fn octocat_stub() -> StubTransport {
        let flat = series_json(&[5.0; 6]);
        StubTransport::new()
            .with_json(REPO, "activity", &series_json(&[1.0, 2.0, 3.0, 4.0, 5.0, 10.0]))
            .with_json(
                REPO,
                "issue_response_time",
                &format!("{{\"avg\": {}}}", series_json(&[5.0, 5.0, 5.0, 5.0, 5.0, 2.0])),
            )
            .with_json(REPO, "participants", &flat)
            .with_json(REPO, "contributors", &flat)
            .with_json(REPO, "bus_factor", &flat)
            .with_json(REPO, "openrank", &flat)
    }

    fn june_window() -> WindowSettings {
        WindowSettings {
            months: 6,
            mode: WindowMode::EndingAt(Month::new(2025, 6).expect("valid month")),
        }
    }

    #[test]
    fn scores_repository_end_to_end() {
        let client = MetricsClient::new(DEFAULT_BASE_URL, octocat_stub());
        let report = analyze_repo(
            &client,
            REPO,
            &FeatureModel::canonical(),
            june_window(),
            AnalyzeOptions::default(),
        )
        .expect("analysis should succeed");

        assert_eq!(report.repo.to_string(), REPO);
        assert!((report.features["activity_trend"] - 8.999991).abs() < 1e-6);
        assert!((report.features["issue_response_time_trend"] - 0.59999988).abs() < 1e-6);
        assert_eq!(report.features["bus_factor_jump"], 0.0);
        assert_eq!(report.potential, 712.67);
        assert_eq!(report.months.len(), 6);
        assert_eq!(report.raw_series[&Metric::Activity], vec![1.0, 2.0, 3.0, 4.0, 5.0, 10.0]);
        assert!(report.checkpoints.is_none());
        assert!(report.averages.is_none());
    }

    #[test]
    fn optional_sections_are_filled_on_request() {
        let client = MetricsClient::new(DEFAULT_BASE_URL, octocat_stub());
        let report = analyze_repo(
            &client,
            REPO,
            &FeatureModel::canonical(),
            june_window(),
            AnalyzeOptions {
                checkpoints: true,
                averages: true,
            },
        )
        .expect("analysis should succeed");

        let checkpoints = report.checkpoints.expect("checkpoints requested");
        assert_eq!(checkpoints.len(), 6);
        assert!(checkpoints[0].is_none());
        let averages = report.averages.expect("averages requested");
        assert_eq!(averages[&Metric::Activity], 4.17);
    }

    #[test]
    fn missing_metric_fails_the_request() {
        let stub = StubTransport::new().with_json(REPO, "activity", &series_json(&[1.0, 2.0]));
        let client = MetricsClient::new(DEFAULT_BASE_URL, stub);
        let err = analyze_repo(
            &client,
            REPO,
            &FeatureModel::canonical(),
            june_window(),
            AnalyzeOptions::default(),
        )
        .expect_err("incomplete fetch set should fail");
        assert!(matches!(err, PotentialError::FetchFailed { .. }));
    }

    #[test]
    fn invalid_repo_is_rejected_before_fetching() {
        let client = MetricsClient::new(DEFAULT_BASE_URL, StubTransport::new());
        let err = analyze_repo(
            &client,
            "octocat/Hello/World",
            &FeatureModel::canonical(),
            june_window(),
            AnalyzeOptions::default(),
        )
        .expect_err("three segments are invalid");
        assert!(matches!(err, PotentialError::InvalidRepoFormat(_)));
    }
}
