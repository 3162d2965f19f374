//! Gemini client for embeddings and text generation
//!
//! Talks to the Generative Language REST API with an API key passed as the
//! `key` query parameter. Requests go through a client-side rate limiter so a
//! burst of messages cannot exhaust the per-minute quota.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::rag::config::RagConfig;
use crate::rag::error::RagError;
use crate::rag::http::execute_json;
use crate::rag::{Embedder, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl From<&RagConfig> for GenerationConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Client for the Gemini embedding and generation endpoints
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    generation_config: GenerationConfig,
    limiter: Arc<DefaultDirectRateLimiter>,
}

#[cfg(test)]
impl GeminiClient {
    /// Set the base URL (for testing only)
    pub fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}

impl GeminiClient {
    /// Create a client with default models and parameters
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, RagError> {
        Self::from_config(api_key, &RagConfig::default())
    }

    /// Create a client using the models, sampling and rate limit from `config`
    pub fn from_config(api_key: impl Into<String>, config: &RagConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            generation_config: GenerationConfig::from(config),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}/models/{}:{}", self.base_url, API_VERSION, model, method)
    }

    /// Embed `text` with the configured embedding model
    #[instrument(skip(self, text), fields(chars = text.len()), level = "debug")]
    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let request = EmbedContentRequest {
            content: Content::text(text),
        };

        self.limiter.until_ready().await;
        let response: EmbedContentResponse = execute_json(
            self.client
                .post(self.model_url(&self.embedding_model, "embedContent"))
                .query(&[("key", &self.api_key)])
                .json(&request),
        )
        .await?;

        debug!(dimensions = response.embedding.values.len(), "Generated embedding");
        Ok(response.embedding.values)
    }

    /// Generate a completion for `prompt` with the configured model
    #[instrument(skip(self, prompt), level = "debug")]
    pub async fn generate_content(&self, prompt: &str) -> Result<String, RagError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            generation_config: self.generation_config.clone(),
        };

        self.limiter.until_ready().await;
        let response: GenerateContentResponse = execute_json(
            self.client
                .post(self.model_url(&self.generation_model, "generateContent"))
                .query(&[("key", &self.api_key)])
                .json(&request),
        )
        .await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or(RagError::EmptyResponse)
    }
}

impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_content(text).await
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        self.generate_content(prompt).await
    }
}
