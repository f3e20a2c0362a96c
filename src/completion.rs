use std::{rc::Rc, time::Duration};

use anyhow::{bail, Context};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::{config::Config, http::HttpClient};

/// Anything that turns a prompt into generated text
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// OpenAI compatible chat completion endpoint (OpenRouter by default)
pub struct OpenRouterClient {
    http: Rc<HttpClient>,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(http: Rc<HttpClient>, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.ai_endpoint.clone(),
            model: config.ai_model.clone(),
            api_key: config.openrouter_api_key.clone(),
            timeout: config.ai_timeout.into(),
        }
    }
}

impl CompletionClient for OpenRouterClient {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });
        let authorization = format!("Bearer {}", self.api_key);
        let headers = [
            ("Authorization", authorization.as_str()),
            ("HTTP-Referer", "http://localhost"),
            ("X-Title", "Cold Mail"),
        ];
        debug!("Requesting completion from {} using {}", self.endpoint, self.model);
        let response = self
            .http
            .post_json(&self.endpoint, &headers, &body, self.timeout)?;
        if !response.is_ok() {
            bail!("AI API error: status {}", response.status);
        }
        parse_completion(&response.body)
    }
}

fn parse_completion(body: &str) -> anyhow::Result<String> {
    let response: CompletionResponse =
        serde_json::from_str(body).context("Failed to parse completion response")?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .context("Completion response had no content")?;
    if content.trim().is_empty() {
        bail!("Completion response content was empty");
    }
    Ok(content)
}
