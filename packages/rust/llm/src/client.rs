//! Chat-completions client for the OpenAI API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use mermagen_shared::{MermagenError, Result};

/// Request timeout for a single model invocation. The pipeline has no
/// internal timeout loop; this is the only bound on a hung call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// TextGenerator trait
// ---------------------------------------------------------------------------

/// The external text-generation capability consumed by pipeline stages.
///
/// Stages treat any failure uniformly: catch, log, degrade to a safe partial
/// update. Implementations must not panic on provider errors.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Invoke the model with a system instruction and a user turn.
    async fn invoke(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI client
// ---------------------------------------------------------------------------

/// reqwest-backed client for the OpenAI chat-completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Build a client for `model` against `base_url`.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mermagen/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MermagenError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn invoke(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MermagenError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MermagenError::Generation(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| MermagenError::Generation(format!("response parse: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MermagenError::Generation("response has no content".into()))?;

        debug!(model = %self.model, length = content.len(), "model response received");
        Ok(content)
    }
}
