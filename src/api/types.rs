use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::models::{ArtifactId, FeedbackAck, FeedbackRequest, GenerationRequest};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateBody<'a> {
    pub prompt: &'a str,
    pub language: Option<&'static str>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl<'a> From<&'a GenerationRequest> for GenerateBody<'a> {
    fn from(req: &'a GenerationRequest) -> Self {
        Self {
            prompt: &req.prompt,
            language: req.language.wire_value(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
    #[serde(default)]
    pub language: String,
    pub model: String,
    pub generation_time_ms: u64,
    pub output_id: ArtifactId,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackBody<'a> {
    pub output_id: &'a ArtifactId,
    pub rating: u8,
    pub comments: Option<&'a str>,
}

impl<'a> From<&'a FeedbackRequest> for FeedbackBody<'a> {
    fn from(req: &'a FeedbackRequest) -> Self {
        Self {
            output_id: &req.artifact_id,
            rating: req.rating.get(),
            comments: req.comments.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub feedback_id: Option<u64>,
}

impl From<FeedbackResponse> for FeedbackAck {
    fn from(resp: FeedbackResponse) -> Self {
        FeedbackAck {
            message: resp.message.unwrap_or_else(|| "Feedback submitted".to_string()),
            feedback_id: resp.feedback_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Timeout")]
    Timeout,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Failures worth another attempt on an idempotent call.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) | ApiError::Timeout => true,
            ApiError::Api { status, .. } => *status == 429 || *status >= 500,
            ApiError::InvalidResponse(_) | ApiError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Http(e.to_string())
        }
    }
}
