pub mod json;
pub mod md;

use crate::error::{PotentialError, Result};
use md::Markdown;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Md,
}

pub fn render<R: Serialize + Markdown>(report: &R, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::to_json(report).map_err(PotentialError::Json),
        OutputFormat::Md => Ok(report.to_markdown()),
    }
}
