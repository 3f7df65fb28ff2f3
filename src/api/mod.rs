pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::models::{FeedbackAck, FeedbackRequest, GenerationRequest, GenerationResult, StatisticsSnapshot};

pub use client::ApiClient;
pub use types::{ApiError, HealthResponse};

/// The remote generation service as seen by the workflow.
#[async_trait]
pub trait CodegenService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ApiError>;

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<FeedbackAck, ApiError>;

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;
}
