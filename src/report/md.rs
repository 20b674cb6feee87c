use crate::stats::pca::WeightDerivation;
use crate::stats::regression::{FitReport, ValidationReport};
use crate::types::report::PotentialReport;

pub trait Markdown {
    fn to_markdown(&self) -> String;
}

impl Markdown for PotentialReport {
    fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("# Potential Report: {}\n\n", self.repo));
        output.push_str(&format!("Potential: {:.2}\n\n", self.potential));
        output.push_str(&format!("Model: {}\n\n", self.model));
        if let (Some(first), Some(last)) = (self.months.first(), self.months.last()) {
            output.push_str(&format!("Window: {first} .. {last} ({} months)\n\n", self.months.len()));
        }

        output.push_str("## Features\n\n");
        for (name, value) in &self.features {
            output.push_str(&format!("- {name}: {value:.6}\n"));
        }
        output.push('\n');

        output.push_str("## Raw Series\n\n");
        for (metric, values) in &self.raw_series {
            let joined: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
            output.push_str(&format!("- {metric}: {}\n", joined.join(", ")));
        }

        if let Some(checkpoints) = &self.checkpoints {
            output.push_str("\n## Checkpoints\n\n");
            for (index, value) in checkpoints.iter().enumerate() {
                match value {
                    Some(score) => output.push_str(&format!("- {} months: {score:.2}\n", index + 1)),
                    None => output.push_str(&format!("- {} months: n/a\n", index + 1)),
                }
            }
        }

        if let Some(averages) = &self.averages {
            output.push_str("\n## Window Averages\n\n");
            for (metric, value) in averages {
                output.push_str(&format!("- {metric}: {value:.2}\n"));
            }
        }

        output
    }
}

impl Markdown for WeightDerivation {
    fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Metric Weights\n\n");
        output.push_str(&format!(
            "Samples: {}, components kept: {}\n\n",
            self.samples, self.n_components
        ));

        output.push_str("## Weights\n\n");
        let mut weights: Vec<_> = self.weights.iter().collect();
        weights.sort_by(|a, b| b.1.total_cmp(a.1));
        for (metric, weight) in weights {
            output.push_str(&format!("- {metric}: {weight:.4}\n"));
        }

        output.push_str("\n## Components\n\n");
        for (index, ratio) in self.explained_variance_ratio.iter().enumerate() {
            output.push_str(&format!(
                "- PC{}: {:.1}% of variance, dominated by {}\n",
                index + 1,
                ratio * 100.0,
                self.dominant_metrics[index]
            ));
        }

        output.push_str("\n## Composite Scores\n\n");
        for sample in &self.composite_scores {
            output.push_str(&format!("- {}: {:.4}\n", sample.id, sample.score));
        }
        if let Some(baseline) = &self.baseline {
            output.push_str(&format!("\nBaseline {}: {:.4}\n", baseline.id, baseline.score));
        }

        output
    }
}

fn fit_section(output: &mut String, title: &str, fit: &FitReport) {
    output.push_str(&format!("## {title}\n\n"));
    output.push_str(&format!(
        "R²: {:.4}, intercept: {:.6}, samples: {}\n\n",
        fit.r_squared, fit.intercept, fit.samples
    ));
    for weight in &fit.weights {
        output.push_str(&format!("- {}: {:+.6}\n", weight.feature, weight.weight));
    }
    output.push('\n');
}

impl Markdown for ValidationReport {
    fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Validation Report\n\n");
        output.push_str(&format!("Common repositories: {}\n\n", self.common_repos));
        if self.low_confidence {
            output.push_str("> Low confidence: too few common repositories for a reliable fit.\n\n");
        }

        output.push_str("## Correlations\n\n");
        for correlation in &self.correlations {
            output.push_str(&format!(
                "- {}: r = {:+.4}, p = {:.4}\n",
                correlation.feature, correlation.r, correlation.p_value
            ));
        }
        output.push('\n');

        match &self.comparison {
            Some(comparison) => {
                fit_section(&mut output, "Model A (all features)", &comparison.with_candidate);
                fit_section(
                    &mut output,
                    &format!("Model B (without {})", comparison.candidate),
                    &comparison.without_candidate,
                );
                output.push_str(&format!("ΔR²: {:+.4}\n\n", comparison.r_squared_delta));
                output.push_str("## Weight Shifts\n\n");
                for shift in &comparison.weight_shifts {
                    output.push_str(&format!(
                        "- {}: {:+.6} -> {:+.6} ({:+.6})\n",
                        shift.feature, shift.with_candidate, shift.without_candidate, shift.shift
                    ));
                }
            }
            None => fit_section(&mut output, "Linear Fit", &self.fit),
        }

        output
    }
}
