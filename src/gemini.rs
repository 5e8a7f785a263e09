//! Model-call boundary.
//!
//! [`ModelClient`] is the seam: one prompt in, one completion out, or a
//! [`ModelError`]. [`call_model`] is the only place those errors are caught;
//! it turns them into [`Generation::Failure`] so nothing past this module
//! ever sees a model fault as an error.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Prefix shown to the user in place of a completion when generation fails.
pub const FAILURE_MARKER: &str = "⚠️ Gemini 出错：";

/// Header carrying the API key, kept out of the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Any fault from the model service. Deliberately not sub-classified for callers.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Http(reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ModelError {
    /// The request URL is dropped so it never reaches user output or logs.
    fn from(e: reqwest::Error) -> Self {
        ModelError::Http(e.without_url())
    }
}

/// Anything that can turn a prompt into a completion.
pub trait ModelClient {
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Success(String),
    /// Human-readable reason, without the marker.
    Failure(String),
}

impl Generation {
    pub fn is_success(&self) -> bool {
        matches!(self, Generation::Success(_))
    }

    /// Text to show where the completion would appear.
    pub fn display_text(&self) -> String {
        match self {
            Generation::Success(text) => text.clone(),
            Generation::Failure(reason) => format!("{FAILURE_MARKER}{reason}"),
        }
    }
}

/// Call the model once. Never fails: errors become [`Generation::Failure`].
pub fn call_model(client: &dyn ModelClient, prompt: &str) -> Generation {
    debug!(prompt_len = prompt.len(), "calling model");
    match client.generate(prompt) {
        Ok(text) => {
            debug!(completion_len = text.len(), "model call succeeded");
            Generation::Success(text)
        }
        Err(e) => {
            warn!(err = %e, "model call failed");
            Generation::Failure(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Blocking client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ModelError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let body = request_body(prompt);
        debug!(model = %self.model, url = %self.endpoint(), "sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        debug!(status = status.as_u16(), body_len = text.len(), "received response");

        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        extract_text(&text)
    }
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ModelError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::InvalidResponse(format!("undecodable JSON: {e}")))?;

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse("no candidates in response".to_owned()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(ModelError::InvalidResponse(format!(
            "candidate has no text (finish reason: {reason})"
        )));
    }

    Ok(text)
}
