use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::Vid2DocError;

/// Trait for producing a document title and summary from the full transcript
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Return (title, summary); implemented as two independent prompt calls
    async fn title_and_summary(&self, full_text: &str) -> Result<(String, String)>;
}

/// Chat-completions request payload
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiSummarizer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!(
                "API key environment variable '{}' is not set",
                config.api_key_env
            )
        })?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Send one prompt and return the first choice's content
    async fn ask(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a skilled technical writer.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach language-model endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Vid2DocError::SummarizationFailed(format!(
                "HTTP {status}: {body}"
            ))
            .into());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat-completions response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                Vid2DocError::SummarizationFailed("Response contained no choices".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn title_and_summary(&self, full_text: &str) -> Result<(String, String)> {
        tracing::info!("Requesting title and summary from {}", self.base_url);

        // Two independent calls, matching the title-prompt / summary-prompt split.
        // No shared caching and no retries; failures propagate to the caller.
        let title = self
            .ask(format!("create a title for the following text: {full_text}"))
            .await?;
        let summary = self
            .ask(format!("create a summary for the following text: {full_text}"))
            .await?;

        Ok((title, summary))
    }
}
