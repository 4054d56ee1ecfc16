//! Gemini `generateContent` client.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use pdfqa_core::config::Settings;
use pdfqa_core::traits::Generator;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
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

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().context("building HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> pdfqa_core::Result<Self> {
        let g = &settings.generation;
        Self::new(settings.api_key()?, g.model.clone(), g.base_url.clone(), Duration::from_secs(g.timeout_secs))
            .map_err(pdfqa_core::Error::Generation)
    }

    pub fn model(&self) -> &str { &self.model }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest { contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }] };
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("calling {} generateContent", self.model))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {text}");
        }

        let parsed: GenerateResponse = response.json().await.context("decoding generateContent response")?;
        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| anyhow!("Gemini returned no candidates"))?;
        let answer: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if answer.is_empty() {
            bail!("Gemini returned an empty answer (finish reason: {})", candidate.finish_reason.as_deref().unwrap_or("unknown"));
        }
        debug!(model = %self.model, elapsed_ms = started.elapsed().as_millis() as u64, "generation finished");
        Ok(answer)
    }
}
