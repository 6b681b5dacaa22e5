//! Generative backends

use crate::error::AugmentError;
use async_trait::async_trait;
use medtriage_core::AugmentationConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque text generator. Output is untrusted.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AugmentError>;

    fn name(&self) -> &str {
        "backend"
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Gemini `generateContent` over REST
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_output_tokens: u32,
}

impl GeminiBackend {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, AugmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature: 0.1,
            max_output_tokens: 2048,
        })
    }

    /// Build from config, reading the key from the configured env var
    pub fn from_config(config: &AugmentationConfig) -> Result<Self, AugmentError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AugmentError::NotConfigured(format!("{} is not set", config.api_key_env)))?;

        let mut backend = Self::new(&config.endpoint, &config.model, &api_key, config.timeout_secs)?;
        backend.temperature = config.temperature;
        backend.max_output_tokens = config.max_output_tokens;
        Ok(backend)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, AugmentError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AugmentError::Http {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| AugmentError::Malformed(e.to_string()))?;

        let output = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| AugmentError::Malformed("no candidates".to_string()))?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if output.trim().is_empty() {
            return Err(AugmentError::EmptyOutput);
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
