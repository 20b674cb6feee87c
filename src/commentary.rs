//! Free-text commentary on a scored repository from an OpenAI-compatible
//! chat completions endpoint. Scoring never depends on this module.

use crate::error::{PotentialError, Result};
use crate::types::config::CommentarySettings;
use crate::types::report::PotentialReport;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

pub trait Commentator {
    fn comment(&self, prompt: &str) -> Result<String>;
}

/// Prompt embedding the score and every feature of `report`.
pub fn build_prompt(report: &PotentialReport) -> String {
    let mut prompt = format!(
        "Assess the growth potential of the open-source repository {}.\n\
         Its potential score is {:.2} (100 means no measurable change; higher is better), \
         computed with model {} over {} months",
        report.repo,
        report.potential,
        report.model,
        report.months.len()
    );
    if let (Some(first), Some(last)) = (report.months.first(), report.months.last()) {
        prompt.push_str(&format!(" from {first} to {last}"));
    }
    prompt.push_str(".\nFeatures:\n");
    for (name, value) in &report.features {
        prompt.push_str(&format!("- {name}: {value:.4}\n"));
    }
    prompt.push_str(
        "Explain what drives the score and give concrete suggestions for the maintainers, in Markdown.",
    );
    prompt
}

pub fn suggest(commentator: &dyn Commentator, report: &PotentialReport) -> Result<String> {
    commentator.comment(&build_prompt(report))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

pub struct ChatCompletionsClient {
    settings: CommentarySettings,
    client: reqwest::blocking::Client,
}

impl ChatCompletionsClient {
    pub fn new(settings: CommentarySettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PotentialError::Commentary(format!("http client: {e}")))?;
        Ok(Self { settings, client })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<String> {
        env::var(&self.settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PotentialError::Commentary(format!("{} is not set", self.settings.api_key_env))
            })
    }
}

impl Commentator for ChatCompletionsClient {
    fn comment(&self, prompt: &str) -> Result<String> {
        let key = self.api_key()?;
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        debug!(endpoint = %self.endpoint(), model = %self.settings.model, "requesting commentary");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&request)
            .send()
            .map_err(|e| PotentialError::Commentary(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PotentialError::Commentary(format!(
                "endpoint returned status {}",
                status.as_u16()
            )));
        }
        let body: ChatCompletionResponse = response
            .json()
            .map_err(|e| PotentialError::Commentary(format!("malformed response: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PotentialError::Commentary("response had no choices".to_string()))
    }
}
