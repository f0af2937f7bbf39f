//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use xpilot_core::config::{LlmConfig, PersonaConfig};

use crate::llm::{build_prompt, LlmClient, LlmError, PromptRequest};

/// Talks to Google's Generative Language API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    persona: PersonaConfig,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, persona: PersonaConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?
            .to_string();

        let mut builder = Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            persona,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Send one request and classify the outcome.
    pub async fn try_send(&self, request: &PromptRequest) -> Result<String, LlmError> {
        let prompt = build_prompt(request, &self.persona);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: prompt.user_text,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: prompt.temperature,
                max_output_tokens: prompt.max_output_tokens,
                top_k: 40,
                top_p: 0.95,
            },
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: prompt.system_text,
                }],
            },
        };

        debug!(
            model = %self.model,
            code = request.generate_code,
            deep = request.think_deeply,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|error| error.message)
                .unwrap_or(text);
            return Err(LlmError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        parsed.into_text()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn send(&self, request: &PromptRequest) -> String {
        match self.try_send(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Gemini request failed");
                e.user_message()
            }
        }
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiSystemInstruction,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: Option<GeminiErrorBody>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, LlmError> {
        let candidate = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| LlmError::MalformedResponse("no candidates".to_string()))?;
        let content = candidate
            .content
            .ok_or_else(|| LlmError::MalformedResponse("candidate has no content".to_string()))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(LlmError::MalformedResponse("no text parts".to_string()));
        }
        Ok(text)
    }
}
