use crate::analyze::model::FeatureModel;
use crate::error::PotentialError;
use crate::provider::DEFAULT_BASE_URL;
use crate::stats::pca::Components;
use crate::stats::regression::DEFAULT_MIN_COMMON_REPOS;
use crate::types::series::{Metric, Month};
use crate::window::WindowMode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PotentialConfig {
    pub provider: Option<ProviderConfig>,
    pub window: Option<WindowConfig>,
    pub model: Option<ModelConfig>,
    pub batch: Option<BatchConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub commentary: Option<CommentaryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowConfig {
    pub months: Option<usize>,
    pub end_month: Option<Month>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    pub preset: Option<String>,
    pub weights: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    /// Drop the repository and keep going.
    Discard,
    /// Abort the whole run with the fetch error.
    Propagate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchConfig {
    pub on_fetch_error: Option<FetchErrorPolicy>,
    pub min_observed_months: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    pub inverted_metrics: Option<Vec<Metric>>,
    pub variance_to_retain: Option<f64>,
    pub n_components: Option<usize>,
    pub candidate_feature: Option<String>,
    pub min_common_repos: Option<usize>,
    pub label_horizon_months: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentaryConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSettings {
    pub months: usize,
    pub mode: WindowMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    pub on_fetch_error: FetchErrorPolicy,
    pub min_observed_months: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            on_fetch_error: FetchErrorPolicy::Discard,
            min_observed_months: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub inverted_metrics: Vec<Metric>,
    pub components: Components,
    pub candidate_feature: String,
    pub min_common_repos: usize,
    pub label_horizon_months: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            inverted_metrics: Metric::ALL
                .iter()
                .copied()
                .filter(|metric| metric.lower_is_better())
                .collect(),
            components: Components::VarianceRatio(0.95),
            candidate_feature: "openrank_trend".to_string(),
            min_common_repos: DEFAULT_MIN_COMMON_REPOS,
            label_horizon_months: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentarySettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

pub const DEFAULT_WINDOW_MONTHS: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Upper bound for both the window length and the label horizon.
pub const MAX_SPAN_MONTHS: u32 = 120;

impl PotentialConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        let provider = self.provider.clone().unwrap_or_default();
        ProviderSettings {
            base_url: provider
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            user_agent: provider
                .user_agent
                .unwrap_or_else(|| format!("potential/{}", env!("CARGO_PKG_VERSION"))),
        }
    }

    pub fn window_settings(&self) -> WindowSettings {
        let window = self.window.clone().unwrap_or_default();
        WindowSettings {
            months: window.months.unwrap_or(DEFAULT_WINDOW_MONTHS),
            mode: window
                .end_month
                .map(WindowMode::EndingAt)
                .unwrap_or(WindowMode::TrailingFullMonths),
        }
    }

    pub fn feature_model(&self) -> Result<FeatureModel, PotentialError> {
        let model = match self.model.as_ref().and_then(|model| model.preset.as_deref()) {
            Some(preset) => FeatureModel::preset(preset)?,
            None => FeatureModel::canonical(),
        };
        match self.model.as_ref().and_then(|model| model.weights.as_ref()) {
            Some(overrides) => model.with_weight_overrides(overrides),
            None => Ok(model),
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        let defaults = BatchSettings::default();
        match &self.batch {
            Some(batch) => BatchSettings {
                on_fetch_error: batch.on_fetch_error.unwrap_or(defaults.on_fetch_error),
                min_observed_months: batch
                    .min_observed_months
                    .unwrap_or(defaults.min_observed_months),
            },
            None => defaults,
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        let defaults = AnalysisSettings::default();
        match &self.analysis {
            Some(analysis) => AnalysisSettings {
                inverted_metrics: analysis
                    .inverted_metrics
                    .clone()
                    .unwrap_or(defaults.inverted_metrics),
                components: match (analysis.n_components, analysis.variance_to_retain) {
                    (Some(count), _) => Components::Count(count),
                    (None, Some(ratio)) => Components::VarianceRatio(ratio),
                    (None, None) => defaults.components,
                },
                candidate_feature: analysis
                    .candidate_feature
                    .clone()
                    .unwrap_or(defaults.candidate_feature),
                min_common_repos: analysis
                    .min_common_repos
                    .unwrap_or(defaults.min_common_repos),
                label_horizon_months: analysis
                    .label_horizon_months
                    .unwrap_or(defaults.label_horizon_months),
            },
            None => defaults,
        }
    }

    pub fn commentary_settings(&self) -> CommentarySettings {
        let commentary = self.commentary.clone().unwrap_or_default();
        CommentarySettings {
            base_url: commentary
                .base_url
                .unwrap_or_else(|| "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()),
            model: commentary.model.unwrap_or_else(|| "qwen-turbo".to_string()),
            api_key_env: commentary
                .api_key_env
                .unwrap_or_else(|| "POTENTIAL_LLM_API_KEY".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), PotentialError> {
        if let Some(provider) = &self.provider {
            if let Some(base_url) = &provider.base_url {
                if !(base_url.starts_with("http://")
                    || base_url.starts_with("https://")
                    || base_url.starts_with("file://"))
                {
                    return Err(PotentialError::ConfigParse(format!(
                        "provider.base_url must be an http(s) or file url: {base_url}"
                    )));
                }
            }
            if provider.timeout_secs == Some(0) {
                return Err(PotentialError::ConfigParse(
                    "provider.timeout_secs must be greater than 0".to_string(),
                ));
            }
        }

        if let Some(months) = self.window.as_ref().and_then(|window| window.months) {
            check_span("window.months", u64::try_from(months).unwrap_or(u64::MAX))?;
        }

        self.feature_model()?;

        if let Some(analysis) = &self.analysis {
            if analysis.n_components.is_some() && analysis.variance_to_retain.is_some() {
                return Err(PotentialError::ConfigParse(
                    "analysis.n_components and analysis.variance_to_retain are mutually exclusive"
                        .to_string(),
                ));
            }
            if analysis.n_components == Some(0) {
                return Err(PotentialError::ConfigParse(
                    "analysis.n_components must be greater than 0".to_string(),
                ));
            }
            if let Some(ratio) = analysis.variance_to_retain {
                if !(ratio > 0.0 && ratio <= 1.0) {
                    return Err(PotentialError::ConfigParse(
                        "analysis.variance_to_retain must be in (0.0, 1.0]".to_string(),
                    ));
                }
            }
            if let Some(horizon) = analysis.label_horizon_months {
                check_span("analysis.label_horizon_months", u64::from(horizon))?;
            }
        }

        Ok(())
    }
}

/// Reject a month span of 0 or above `MAX_SPAN_MONTHS`.
pub fn check_span(name: &str, months: u64) -> Result<(), PotentialError> {
    if months == 0 {
        return Err(PotentialError::ConfigParse(format!(
            "{name} must be greater than 0"
        )));
    }
    if months > u64::from(MAX_SPAN_MONTHS) {
        return Err(PotentialError::ConfigParse(format!(
            "{name} must be at most {MAX_SPAN_MONTHS}"
        )));
    }
    Ok(())
}
