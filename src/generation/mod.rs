//! Generation port
//!
//! Narrow interface over the language-model backend: prompt in, text out.
//! The production implementation targets an Ollama-style HTTP API via
//! POST /api/generate (non-streaming). Every call site owns its own
//! deterministic fallback, so failures here never decide control flow.

use crate::errors::{AdvisorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default generation backend endpoint
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Generation port: prompt in, text out
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Generate a completion for `prompt` bounded to `max_tokens`
    ///
    /// Fails with `GenerationTimeout` when the deadline passes and
    /// `GenerationError` for upstream errors or empty output.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for an Ollama-style generation backend
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    /// Create a generator with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AdvisorError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Create a generator with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, DEFAULT_MODEL, Duration::from_secs(30))
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl GenerationPort for OllamaGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdvisorError::GenerationTimeout {
                        duration_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AdvisorError::GenerationError(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdvisorError::GenerationError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::GenerationError(format!("Malformed response: {}", e)))?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(AdvisorError::GenerationError(
                "Empty generation output".to_string(),
            ));
        }

        Ok(text)
    }
}
