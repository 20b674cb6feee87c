use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "potential",
    version,
    about = "Repository growth-potential scoring and weight calibration CLI"
)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Directory holding potential.toml and .potential/local.toml
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score one repository
    Score(ScoreCommand),
    /// Collect feature vectors for a list of repositories
    Features(FeaturesCommand),
    /// Build forward openrank growth labels for a list of repositories
    Labels(LabelsCommand),
    /// Derive PCA metric weights from a sample batch
    Weights(WeightsCommand),
    /// Check feature vectors against growth labels
    Validate(ValidateCommand),
    /// Ask a chat model for commentary on a repository's score
    Suggest(SuggestCommand),
}

#[derive(Args, Clone, Default)]
pub struct ProviderArgs {
    /// Metrics provider base URL (https://... or file:///path)
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Args, Clone, Default)]
pub struct WindowArgs {
    /// Last month of the window (YYYY-MM); defaults to the last full month
    #[arg(long)]
    pub end_month: Option<String>,
    /// Window length in months
    #[arg(long)]
    pub months: Option<usize>,
}

#[derive(Args)]
pub struct ScoreCommand {
    /// Repository as owner/name
    pub repo: String,
    #[command(flatten)]
    pub window: WindowArgs,
    #[command(flatten)]
    pub provider: ProviderArgs,
    /// Include the score of every window prefix
    #[arg(long)]
    pub checkpoints: bool,
    /// Include the mean of each metric over the window
    #[arg(long)]
    pub averages: bool,
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,
}

#[derive(Args)]
pub struct FeaturesCommand {
    /// JSON array of owner/name identifiers
    pub repos: PathBuf,
    #[command(flatten)]
    pub window: WindowArgs,
    #[command(flatten)]
    pub provider: ProviderArgs,
    /// Write records here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct LabelsCommand {
    /// JSON array of owner/name identifiers
    pub repos: PathBuf,
    /// Month the label is measured from (YYYY-MM)
    #[arg(long)]
    pub eval_month: String,
    /// Months between the evaluation month and the label month
    #[arg(long)]
    pub horizon: Option<u32>,
    #[command(flatten)]
    pub provider: ProviderArgs,
    /// Label cache; existing entries are kept and not fetched again
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct WeightsCommand {
    /// JSON object of metric name to one value per sample
    pub samples: PathBuf,
    /// Zero-based row scored as the baseline instead of as a sample
    #[arg(long)]
    pub baseline: Option<usize>,
    /// Keep every principal component
    #[arg(long, conflicts_with_all = ["components", "variance"])]
    pub all_components: bool,
    /// Keep exactly this many principal components
    #[arg(long, conflicts_with = "variance")]
    pub components: Option<usize>,
    /// Keep the fewest components reaching this explained-variance ratio
    #[arg(long)]
    pub variance: Option<f64>,
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,
}

#[derive(Args)]
pub struct ValidateCommand {
    /// Feature records from `potential features`
    #[arg(long)]
    pub features: PathBuf,
    /// Label records from `potential labels`
    #[arg(long)]
    pub labels: PathBuf,
    /// Also fit without this feature (the configured candidate when no name is given)
    #[arg(long, num_args = 0..=1)]
    pub candidate: Option<Option<String>>,
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,
}

#[derive(Args)]
pub struct SuggestCommand {
    /// Repository as owner/name
    pub repo: String,
    #[command(flatten)]
    pub window: WindowArgs,
    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Json,
    Md,
}
