use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Prompt-in, text-out access to a generative model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, api_base: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "temperature": 0.7,
                "responseMimeType": "application/json"
            }
        });

        let res = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            tracing::warn!(status, "Gemini request failed");
            return Err(GenerationError::from_status(status, text));
        }

        let body: GeminiResponse = res
            .json()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        extract_text(body).ok_or(GenerationError::EmptyResponse)
    }
}

fn extract_text(body: GeminiResponse) -> Option<String> {
    let text: String = body
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
