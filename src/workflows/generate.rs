use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::models::*;
use crate::workflows::{InFlightGuard, Workflow, WorkflowError};

pub const GENERATING_MESSAGE: &str = "Generating code...";

/// A generation that passed validation and holds the in-flight gate.
pub(crate) struct PendingGeneration {
    request: GenerationRequest,
    action_id: String,
    _guard: InFlightGuard,
}

impl Workflow {
    /// Generates code for `prompt` and stores the result as the current
    /// artifact.
    pub async fn generate(
        &self,
        prompt: &str,
        language: LanguageHint,
    ) -> Result<GenerationResult, WorkflowError> {
        let pending = self.begin_generation(prompt, language)?;
        self.finish_generation(pending).await
    }

    /// Like [`Workflow::generate`], but runs the service call on a spawned
    /// task. Validation and the in-flight gate are applied before this
    /// returns, so a second call made while the task runs is rejected.
    pub fn spawn_generate(
        &self,
        prompt: &str,
        language: LanguageHint,
    ) -> Result<JoinHandle<Result<GenerationResult, WorkflowError>>, WorkflowError> {
        let pending = self.begin_generation(prompt, language)?;
        let workflow = self.clone();
        Ok(tokio::spawn(async move { workflow.finish_generation(pending).await }))
    }

    fn begin_generation(
        &self,
        prompt: &str,
        language: LanguageHint,
    ) -> Result<PendingGeneration, WorkflowError> {
        let Some(guard) = self.inner.generating.try_acquire() else {
            tracing::debug!("generation rejected: another generation is in flight");
            return Err(WorkflowError::GenerationInFlight);
        };

        let Some(request) = GenerationRequest::new(prompt, language) else {
            let err = WorkflowError::EmptyPrompt;
            self.set_status(WorkflowStatus::Error(err.status_message()));
            return Err(err);
        };

        // A failed new generation leaves an empty panel, never the previous
        // artifact.
        self.reset_session();
        self.set_status(WorkflowStatus::Info(GENERATING_MESSAGE.to_string()));

        Ok(PendingGeneration { request, action_id: new_action_id(), _guard: guard })
    }

    async fn finish_generation(
        &self,
        pending: PendingGeneration,
    ) -> Result<GenerationResult, WorkflowError> {
        let span = tracing::info_span!("generate", action_id = %pending.action_id);
        let outcome = self.inner.service
            .generate(&pending.request)
            .instrument(span.clone())
            .await;
        let _enter = span.enter();

        match outcome {
            Ok(result) => {
                tracing::info!(
                    language = %result.language,
                    model = %result.model_name,
                    generation_time_ms = result.generation_time_ms,
                    artifact_id = %result.artifact_id,
                    "code generated"
                );
                self.state().session.replace(result.clone());
                self.set_status(WorkflowStatus::Success(result.summary()));
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                let err = WorkflowError::from(e);
                self.set_status(WorkflowStatus::Error(err.status_message()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::testing::{sample_result, FakeService};
    use crate::workflows::ErrorKind;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_whitespace_prompt_never_reaches_service() {
        let fake = Arc::new(FakeService::default());
        let workflow = Workflow::new(fake.clone());

        for prompt in ["", "   ", "\n\t", " \r\n "] {
            let err = workflow.generate(prompt, LanguageHint::Auto).await.unwrap_err();
            assert!(matches!(err, WorkflowError::EmptyPrompt));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(fake.generate_calls(), 0);
        assert_eq!(workflow.status(), WorkflowStatus::Error("Please enter a prompt".into()));
        assert!(!workflow.is_generating());
    }

    #[tokio::test]
    async fn test_binary_search_scenario() {
        let fake = Arc::new(FakeService::default());
        fake.respond_with(GenerationResult {
            code: "def binary_search(xs, t): ...".into(),
            language: "python".into(),
            model_name: "mistral".into(),
            generation_time_ms: 842,
            artifact_id: ArtifactId::from("abc123"),
            received_at: now_iso(),
        });
        let workflow = Workflow::new(fake.clone());

        let result = workflow
            .generate("Create a binary search in Python", "auto".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(result.artifact_id, ArtifactId::from("abc123"));
        let sent = fake.last_generate().unwrap();
        assert_eq!(sent.language, LanguageHint::Auto);
        assert_eq!(sent.temperature, GENERATION_TEMPERATURE);
        assert_eq!(sent.max_tokens, GENERATION_MAX_TOKENS);

        match workflow.status() {
            WorkflowStatus::Success(msg) => {
                assert!(msg.contains("python"), "{}", msg);
                assert!(msg.contains("842"), "{}", msg);
                assert!(msg.contains("mistral"), "{}", msg);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(workflow.artifact().unwrap().artifact_id, ArtifactId::from("abc123"));
        assert!(!workflow.is_generating());
    }

    #[tokio::test]
    async fn test_second_generate_rejected_while_in_flight() {
        let fake = Arc::new(FakeService::default().holding_generate());
        let workflow = Workflow::new(fake.clone());

        let handle = workflow.spawn_generate("first", LanguageHint::Rust).unwrap();
        assert!(workflow.is_generating());

        let err = workflow.generate("second", LanguageHint::Rust).await.unwrap_err();
        assert!(matches!(err, WorkflowError::GenerationInFlight));
        assert_eq!(err.kind(), ErrorKind::Busy);
        let err = workflow.spawn_generate("third", LanguageHint::Go).unwrap_err();
        assert!(matches!(err, WorkflowError::GenerationInFlight));
        // The in-flight call still owns the status line.
        assert_eq!(workflow.status(), WorkflowStatus::Info(GENERATING_MESSAGE.into()));

        fake.release_generate();
        handle.await.unwrap().unwrap();

        assert_eq!(fake.generate_calls(), 1);
        assert_eq!(fake.last_generate().unwrap().prompt, "first");
        assert!(!workflow.is_generating());
        fake.release_generate();
        assert!(workflow.generate("again", LanguageHint::Rust).await.is_ok());
    }

    #[tokio::test]
    async fn test_previous_artifact_cleared_before_response() {
        let fake = Arc::new(FakeService::default().holding_generate());
        let workflow = Workflow::new(fake.clone());
        workflow.state().session.replace(sample_result("old"));
        workflow.set_rating(3);
        workflow.set_comments("meh");

        let handle = workflow.spawn_generate("new one", LanguageHint::Auto).unwrap();

        assert!(!workflow.is_present());
        assert_eq!(workflow.draft(), FeedbackDraft::default());
        assert_eq!(workflow.status(), WorkflowStatus::Info(GENERATING_MESSAGE.into()));

        fake.release_generate();
        handle.await.unwrap().unwrap();
        assert!(workflow.is_present());
    }

    #[tokio::test]
    async fn test_failed_generation_leaves_empty_session() {
        let fake = Arc::new(FakeService::default());
        fake.fail_generate(503, "model offline");
        let workflow = Workflow::new(fake.clone());
        workflow.state().session.replace(sample_result("old"));

        let err = workflow.generate("write fizzbuzz", LanguageHint::Go).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!workflow.is_present());
        assert_eq!(
            workflow.status(),
            WorkflowStatus::Error("Error: API error 503: model offline".into())
        );
        assert_eq!(fake.generate_calls(), 1);
        assert!(!workflow.is_generating());
    }

    #[tokio::test]
    async fn test_clear_during_flight_does_not_abort() {
        let fake = Arc::new(FakeService::default().holding_generate());
        let workflow = Workflow::new(fake.clone());

        let handle = workflow.spawn_generate("slow one", LanguageHint::Auto).unwrap();
        workflow.clear();
        assert_eq!(workflow.status(), WorkflowStatus::Idle);
        assert!(workflow.is_generating());

        fake.release_generate();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(fake.generate_calls(), 1);
    }
}
