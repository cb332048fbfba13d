//! Ollama HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{LanguageModel, ModelError};

/// Where a local Ollama listens by default.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Chat completions on CPU-bound local models can be slow.
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Health checks should fail fast.
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelItem>,
}

#[derive(Debug, Deserialize)]
struct ModelItem {
    #[serde(default)]
    name: String,
}

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: Client,
}

impl OllamaClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:11434`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers on `/api/tags`.
    pub async fn is_running(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Ollama not reachable at {}: {e}", self.base_url);
                false
            }
        }
    }

    /// Names of locally pulled models.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers unexpectedly.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(TAGS_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether `model` is pulled. See [`model_matches`].
    ///
    /// # Errors
    ///
    /// Returns an error if the model list cannot be fetched.
    pub async fn has_model(&self, model: &str) -> Result<bool, ModelError> {
        let available = self.list_models().await?;
        Ok(available.iter().any(|name| model_matches(model, name)))
    }
}

/// Loose match so `mistral` finds `mistral:latest` and `mistral:7b` finds `mistral:7b-instruct`.
#[must_use]
pub fn model_matches(wanted: &str, available: &str) -> bool {
    !wanted.is_empty()
        && !available.is_empty()
        && (available.contains(wanted) || wanted.contains(available))
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false
        });

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .timeout(CHAT_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Ollama returned {status} for model {model}");
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}
