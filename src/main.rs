mod analyze;
mod batch;
mod cli;
mod commentary;
mod config;
mod dataset;
mod error;
mod provider;
mod report;
mod stats;
mod types;
mod window;

use crate::analyze::AnalyzeOptions;
use crate::error::{PotentialError, Result};
use crate::provider::transport::{transport_for, Transport};
use crate::provider::MetricsClient;
use crate::stats::pca::Components;
use crate::types::config::{check_span, PotentialConfig, WindowSettings};
use crate::types::report::LabelRecord;
use crate::types::series::{Metric, Month};
use crate::window::WindowMode;
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const WARNINGS: i32 = 1;
    pub const RUNTIME_FAILURE: i32 = 3;
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn window_settings(cfg: &PotentialConfig, args: &cli::WindowArgs) -> Result<WindowSettings> {
    let mut settings = cfg.window_settings();
    if let Some(raw) = &args.end_month {
        settings.mode = WindowMode::EndingAt(raw.parse()?);
    }
    if let Some(months) = args.months {
        check_span("--months", u64::try_from(months).unwrap_or(u64::MAX))?;
        settings.months = months;
    }
    Ok(settings)
}

fn metrics_client(
    cfg: &PotentialConfig,
    args: &cli::ProviderArgs,
) -> Result<MetricsClient<Box<dyn Transport>>> {
    let settings = cfg.provider_settings();
    let base_url = args.provider.clone().unwrap_or(settings.base_url);
    let transport = transport_for(&base_url, settings.timeout, &settings.user_agent)?;
    Ok(MetricsClient::new(&base_url, transport))
}

fn output_format(format: cli::ReportFormat) -> report::OutputFormat {
    match format {
        cli::ReportFormat::Json => report::OutputFormat::Json,
        cli::ReportFormat::Md => report::OutputFormat::Md,
    }
}

fn emit_records<T: Serialize + ?Sized>(records: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            dataset::write_json(path, records)?;
            info!(path = %path.display(), "wrote records");
        }
        None => println!("{}", report::json::to_json(records)?),
    }
    Ok(())
}

fn components(cmd: &cli::WeightsCommand, cfg: &PotentialConfig) -> Result<Components> {
    if cmd.all_components {
        return Ok(Components::All);
    }
    match (cmd.components, cmd.variance) {
        (Some(0), _) => Err(PotentialError::ConfigParse(
            "--components must be greater than 0".to_string(),
        )),
        (Some(count), _) => Ok(Components::Count(count)),
        (None, Some(ratio)) if !(ratio > 0.0 && ratio <= 1.0) => Err(PotentialError::ConfigParse(
            "--variance must be in (0.0, 1.0]".to_string(),
        )),
        (None, Some(ratio)) => Ok(Components::VarianceRatio(ratio)),
        (None, None) => Ok(cfg.analysis_settings().components),
    }
}

fn run() -> Result<i32> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let cfg = config::load_config(&cli.config_dir)?;

    match cli.command {
        cli::Commands::Score(cmd) => {
            let client = metrics_client(&cfg, &cmd.provider)?;
            let potential_report = analyze::analyze_repo(
                &client,
                &cmd.repo,
                &cfg.feature_model()?,
                window_settings(&cfg, &cmd.window)?,
                AnalyzeOptions {
                    checkpoints: cmd.checkpoints,
                    averages: cmd.averages,
                },
            )?;
            let rendered = report::render(&potential_report, output_format(cmd.format))?;
            println!("{rendered}");
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Features(cmd) => {
            let repos = dataset::read_repo_list(&cmd.repos)?;
            let client = metrics_client(&cfg, &cmd.provider)?;
            let outcome = batch::collect_features(
                &client,
                &repos,
                &cfg.feature_model()?,
                window_settings(&cfg, &cmd.window)?,
                cfg.batch_settings(),
            )?;
            emit_records(&outcome.records, cmd.out.as_deref())?;
            for discarded in &outcome.discarded {
                eprintln!("warning: discarded {}: {}", discarded.repo, discarded.reason);
            }

            if outcome.discarded.is_empty() {
                Ok(exit_code::SUCCESS)
            } else {
                Ok(exit_code::WARNINGS)
            }
        }
        cli::Commands::Labels(cmd) => {
            let eval: Month = cmd.eval_month.parse()?;
            let horizon = cmd
                .horizon
                .unwrap_or(cfg.analysis_settings().label_horizon_months);
            check_span("--horizon", u64::from(horizon))?;
            let repos = dataset::read_repo_list(&cmd.repos)?;
            let cached = match &cmd.out {
                Some(path) => dataset::read_labels(path)?,
                None => Vec::new(),
            };
            let client = metrics_client(&cfg, &cmd.provider)?;
            let outcome = batch::build_labels(
                &client,
                &repos,
                eval,
                horizon,
                cached,
                cfg.batch_settings().on_fetch_error,
            )?;
            emit_records(&outcome.records, cmd.out.as_deref())?;
            for discarded in &outcome.discarded {
                eprintln!("warning: no label for {}: {}", discarded.repo, discarded.reason);
            }

            if outcome.discarded.is_empty() {
                Ok(exit_code::SUCCESS)
            } else {
                Ok(exit_code::WARNINGS)
            }
        }
        cli::Commands::Weights(cmd) => {
            let columns = dataset::read_samples(&cmd.samples)?;
            let metrics: Vec<Metric> = columns.keys().copied().collect();
            let samples = stats::standardize::SampleMatrix::from_columns(&columns, &metrics)?;
            let selection = components(&cmd, &cfg)?;
            let inverted = cfg.analysis_settings().inverted_metrics;

            let derivation = match cmd.baseline {
                Some(row) => {
                    stats::pca::derive_weights_with_baseline(&samples, &inverted, row, selection)?
                }
                None => stats::pca::derive_weights(
                    &stats::standardize::standardize(&samples, &inverted)?,
                    selection,
                )?,
            };
            let rendered = report::render(&derivation, output_format(cmd.format))?;
            println!("{rendered}");
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Validate(cmd) => {
            let features = dataset::read_features(&cmd.features)?;
            let labels: Vec<LabelRecord> = dataset::read_json(&cmd.labels)?;
            let analysis = cfg.analysis_settings();
            let candidate = match cmd.candidate {
                Some(Some(name)) => Some(name),
                Some(None) => Some(analysis.candidate_feature.clone()),
                None => None,
            };

            let validation = stats::regression::validate(
                &features,
                &labels,
                candidate.as_deref(),
                analysis.min_common_repos,
            )?;
            let rendered = report::render(&validation, output_format(cmd.format))?;
            println!("{rendered}");

            if validation.low_confidence {
                eprintln!(
                    "warning: only {} common repositories (minimum {}); results are low-confidence",
                    validation.common_repos, analysis.min_common_repos
                );
                Ok(exit_code::WARNINGS)
            } else {
                Ok(exit_code::SUCCESS)
            }
        }
        cli::Commands::Suggest(cmd) => {
            let client = metrics_client(&cfg, &cmd.provider)?;
            let potential_report = analyze::analyze_repo(
                &client,
                &cmd.repo,
                &cfg.feature_model()?,
                window_settings(&cfg, &cmd.window)?,
                AnalyzeOptions::default(),
            )?;
            let commentator = commentary::ChatCompletionsClient::new(
                cfg.commentary_settings(),
                cfg.provider_settings().timeout,
            )?;
            let text = commentary::suggest(&commentator, &potential_report)?;
            println!("{text}");
            Ok(exit_code::SUCCESS)
        }
    }
}

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code::RUNTIME_FAILURE);
        }
    }
}
