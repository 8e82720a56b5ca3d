use std::future::Future;
use std::time::Duration;

use eyre::{Result, bail};
use log::debug;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "tinyllama";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// What the generation service handed back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// The response decoded but had no `response` field
    Missing,
}

impl Generation {
    /// The generated text, or `placeholder` when the service returned none
    pub fn or_placeholder(self, placeholder: &str) -> String {
        match self {
            Generation::Text(text) => text,
            Generation::Missing => placeholder.to_string(),
        }
    }
}

/// Something that turns a prompt into text
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<Generation>> + Send;
}

/// Client for an Ollama-style `/api/generate` endpoint, non-streaming
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        debug!(
            "Generating with model {} at {} ({} prompt chars)",
            self.model,
            self.endpoint,
            prompt.chars().count()
        );

        let body = request_body(&self.model, prompt);

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("generation endpoint returned {status}: {body}");
        }

        let json: serde_json::Value = resp.json().await?;
        Ok(extract_response(&json))
    }
}

fn request_body(model: &str, prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "prompt": prompt,
        "stream": false
    })
}

fn extract_response(json: &serde_json::Value) -> Generation {
    match json.get("response").and_then(|r| r.as_str()) {
        Some(text) => Generation::Text(text.to_string()),
        None => Generation::Missing,
    }
}
