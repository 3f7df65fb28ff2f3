//! In-memory stand-in for the generation service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{ApiError, CodegenService, HealthResponse};
use crate::models::*;

pub(crate) fn sample_result(id: &str) -> GenerationResult {
    GenerationResult {
        code: "fn main() {}".into(),
        language: "rust".into(),
        model_name: "mistral".into(),
        generation_time_ms: 100,
        artifact_id: ArtifactId::from(id),
        received_at: now_iso(),
    }
}

pub(crate) fn sample_statistics(total_feedback: u64) -> StatisticsSnapshot {
    StatisticsSnapshot {
        total_prompts: 10,
        total_feedback,
        avg_rating: 4.2,
        learning_patterns: 3,
        total_outputs: None,
        total_users: None,
        model_performance: Vec::new(),
    }
}

#[derive(Default)]
pub(crate) struct FakeService {
    generate_response: Mutex<Option<GenerationResult>>,
    generate_failure: Mutex<Option<(u16, String)>>,
    feedback_failure: Mutex<Option<(u16, String)>>,
    statistics_response: Mutex<Option<StatisticsSnapshot>>,
    hold_generate: Option<Arc<Notify>>,
    hold_feedback: Option<Arc<Notify>>,
    stall_statistics: bool,
    last_generate: Mutex<Option<GenerationRequest>>,
    last_feedback: Mutex<Option<FeedbackRequest>>,
    generate_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
    statistics_calls: AtomicUsize,
}

impl FakeService {
    pub fn holding_generate(mut self) -> Self {
        self.hold_generate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn holding_feedback(mut self) -> Self {
        self.hold_feedback = Some(Arc::new(Notify::new()));
        self
    }

    /// Statistics calls never resolve.
    pub fn stalling_statistics(mut self) -> Self {
        self.stall_statistics = true;
        self
    }

    pub fn release_generate(&self) {
        if let Some(n) = &self.hold_generate {
            n.notify_one();
        }
    }

    pub fn release_feedback(&self) {
        if let Some(n) = &self.hold_feedback {
            n.notify_one();
        }
    }

    pub fn respond_with(&self, result: GenerationResult) {
        *self.generate_response.lock().unwrap() = Some(result);
    }

    pub fn fail_generate(&self, status: u16, message: &str) {
        *self.generate_failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn fail_feedback(&self, status: u16, message: &str) {
        *self.feedback_failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn succeed_feedback(&self) {
        *self.feedback_failure.lock().unwrap() = None;
    }

    pub fn serve_statistics(&self, snapshot: Option<StatisticsSnapshot>) {
        *self.statistics_response.lock().unwrap() = snapshot;
    }

    pub fn last_generate(&self) -> Option<GenerationRequest> {
        self.last_generate.lock().unwrap().clone()
    }

    pub fn last_feedback(&self) -> Option<FeedbackRequest> {
        self.last_feedback.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }

    pub fn statistics_calls(&self) -> usize {
        self.statistics_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodegenService for FakeService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_generate.lock().unwrap() = Some(request.clone());
        if let Some(n) = &self.hold_generate {
            n.notified().await;
        }
        if let Some((status, message)) = self.generate_failure.lock().unwrap().clone() {
            return Err(ApiError::Api { status, message });
        }
        let mut result = self.generate_response.lock().unwrap().clone()
            .unwrap_or_else(|| sample_result("generated-1"));
        result.received_at = now_iso();
        Ok(result)
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<FeedbackAck, ApiError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_feedback.lock().unwrap() = Some(request.clone());
        if let Some(n) = &self.hold_feedback {
            n.notified().await;
        }
        if let Some((status, message)) = self.feedback_failure.lock().unwrap().clone() {
            return Err(ApiError::Api { status, message });
        }
        Ok(FeedbackAck { message: "Feedback submitted successfully".into(), feedback_id: Some(1) })
    }

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError> {
        self.statistics_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_statistics {
            std::future::pending::<()>().await;
        }
        self.statistics_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Http("connection refused".into()))
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse { status: "healthy".into(), timestamp: None })
    }
}
