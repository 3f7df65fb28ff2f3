use async_trait::async_trait;
use backoff::{future::retry, Error as BackoffError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::types::*;
use crate::api::CodegenService;
use crate::config::ClientConfig;
use crate::models::*;

const GENERATE_PATH: &str = "/api/generate";
const FEEDBACK_PATH: &str = "/api/feedback";
const STATISTICS_PATH: &str = "/api/statistics";
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn fetch_statistics_once(&self) -> Result<StatisticsSnapshot, ApiError> {
        let url = self.config.endpoint(STATISTICS_PATH);
        tracing::debug!(%url, "fetching statistics");
        let response = self.http.get(&url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl CodegenService for ApiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ApiError> {
        let url = self.config.endpoint(GENERATE_PATH);
        tracing::debug!(%url, language = %request.language, "sending generate request");

        let response = self.http
            .post(&url)
            .json(&GenerateBody::from(request))
            .send()
            .await?;

        let body: GenerateResponse = decode(response).await?;
        let language = resolve_language(&body.language, request.language)?;

        Ok(GenerationResult {
            code: body.code,
            language,
            model_name: body.model,
            generation_time_ms: body.generation_time_ms,
            artifact_id: body.output_id,
            received_at: now_iso(),
        })
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<FeedbackAck, ApiError> {
        let url = self.config.endpoint(FEEDBACK_PATH);
        tracing::debug!(%url, output_id = %request.artifact_id, rating = request.rating.get(), "sending feedback");

        let response = self.http
            .post(&url)
            .json(&FeedbackBody::from(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response).await);
        }
        // The acknowledgement body is informational; an unreadable one still
        // counts as accepted.
        let ack = response.json::<FeedbackResponse>().await.unwrap_or_default();
        Ok(ack.into())
    }

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError> {
        let Some(policy) = &self.config.statistics_retry else {
            return self.fetch_statistics_once().await;
        };

        let operation = || async {
            self.fetch_statistics_once().await.map_err(|e| {
                if e.is_transient() {
                    tracing::debug!(error = %e, "statistics fetch failed, retrying");
                    BackoffError::transient(e)
                } else {
                    BackoffError::permanent(e)
                }
            })
        };

        retry(policy.backoff(), operation).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.config.endpoint(HEALTH_PATH);
        let response = self.http.get(&url).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    ApiError::Api { status, message: error_message(&text) }
}

/// Pulls `detail` out of a JSON error body, otherwise returns the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => match obj.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.trim().to_string(),
    }
}

fn resolve_language(reported: &str, hint: LanguageHint) -> Result<String, ApiError> {
    let reported = reported.trim();
    if !reported.is_empty() && !reported.eq_ignore_ascii_case("auto") {
        return Ok(reported.to_string());
    }
    hint.wire_value()
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidResponse("response did not name a language".to_string()))
}
