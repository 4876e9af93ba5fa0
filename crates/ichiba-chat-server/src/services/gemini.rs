use crate::config::GeminiConfig;
use crate::services::conversation::manager::LlmProvider;
use crate::utils::error::ApiError;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Single-turn text client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

// Response Structures
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|e| {
                    warn!("Gemini client build failed, falling back to defaults without timeout: {}", e);
                    Client::new()
                }),
            config,
        }
    }

    fn endpoint(&self) -> Result<Url, ApiError> {
        let base = format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        Url::parse_with_params(&base, &[("key", self.config.api_key.as_str())])
            .map_err(|e| ApiError::InternalError(format!("Invalid Gemini endpoint {:?}: {}", base, e)))
    }

    /// Send `prompt` as the only content of a single-turn request and return
    /// `candidates[0].content.parts[0].text`.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, ApiError> {
        debug!("Gemini request: model={}, prompt_chars={}", self.config.model, prompt.chars().count());

        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which includes the key
                let e = e.without_url();
                error!("Gemini network error: {}", e);
                ApiError::LlmError(format!("Gemini Network Error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Gemini API returned {}: {}", status, text);
            return Err(ApiError::LlmError(format!("Gemini API Error ({}): {}", status, text)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to parse Gemini response: {}", e)))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| ApiError::LlmError("Gemini returned no candidate text".to_string()))
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiService {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        self.generate_content(prompt).await
    }
}
