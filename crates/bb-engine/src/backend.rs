//! The image generation backend. One opaque, fallible, possibly slow call:
//! prompt in, raw image bytes out. The production implementation talks to
//! the Gemini REST API; tests substitute their own.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use bb_core::ImageModel;

use crate::error::EngineError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate one image. May fail or hang arbitrarily long; callers are
    /// responsible for enforcing a deadline.
    async fn generate(
        &self,
        prompt: &str,
        model: ImageModel,
        api_key: &str,
    ) -> Result<Vec<u8>, EngineError>;

    /// Cheap probe that the given API key is accepted at all.
    async fn validate_key(&self, api_key: &str) -> Result<(), EngineError>;
}

pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    async fn generate(
        &self,
        prompt: &str,
        model: ImageModel,
        api_key: &str,
    ) -> Result<Vec<u8>, EngineError> {
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, model.id());

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Backend(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateContentResponse = response.json().await?;

        // The image arrives as one inline-data part among the candidates;
        // a structurally valid response without one is still a failure.
        let inline = parsed
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
            .ok_or_else(|| EngineError::Backend("No image data in response".to_string()))?;

        Ok(general_purpose::STANDARD.decode(&inline.data)?)
    }

    async fn validate_key(&self, api_key: &str) -> Result<(), EngineError> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(EngineError::Backend(format!("HTTP {}: {}", status, body)))
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

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
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}
