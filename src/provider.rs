//! The extraction-provider seam: image in, field text out.
//!
//! The external image-understanding service is the single network
//! dependency of the whole pipeline, so it sits behind the object-safe
//! [`ExtractionProvider`] trait. Swapping the concrete service — or
//! substituting a canned double in tests — is the only way extraction
//! quality changes; nothing else in the pipeline knows what a model is.
//!
//! [`GeminiProvider`] is the in-tree implementation, speaking the
//! `generateContent` REST contract directly over [`reqwest`].

use crate::pipeline::encode::ImagePayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default model used when the caller does not pick one.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Error surfaced by an [`ExtractionProvider`] implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("provider returned no text candidates")]
    EmptyReply,
}

/// Maps an image plus an instruction to the service's textual reply.
///
/// Implementations perform exactly one synchronous request per call: no
/// retries, no batching. The reply is raw text — fence-stripping and JSON
/// parsing are the caller's job (see [`crate::pipeline::parse`]), keeping
/// providers ignorant of the field schema.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Issue one request carrying `instruction` and `image`, returning the
    /// reply text.
    async fn extract(&self, instruction: &str, image: &ImagePayload)
        -> Result<String, ProviderError>;

    /// Short provider name for logs and error hints.
    fn name(&self) -> &str;
}

// ── Gemini REST types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// ── Gemini provider ──────────────────────────────────────────────────────

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiProvider {
    /// Build a provider for `model` with the given per-request timeout.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
        })
    }

    /// Override the API endpoint (local doubles, regional deployments).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl ExtractionProvider for GeminiProvider {
    async fn extract(
        &self,
        instruction: &str,
        image: &ImagePayload,
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart {
                        text: Some(instruction),
                        inline_data: None,
                    },
                    RequestPart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        }),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("HTTP {status}: {detail}")));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::EmptyReply);
        }

        debug!(model = %self.model, reply_len = text.len(), "provider reply received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
