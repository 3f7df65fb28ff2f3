use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::models::*;
use crate::workflows::{InFlightGuard, Workflow, WorkflowError};

pub const FEEDBACK_THANKS: &str = "Thank you for your feedback!";

pub(crate) struct PendingFeedback {
    request: FeedbackRequest,
    action_id: String,
    _guard: InFlightGuard,
}

impl Workflow {
    /// Sets the pending rating and comments, then submits them.
    pub async fn rate(&self, rating: i64, comments: Option<&str>) -> Result<FeedbackAck, WorkflowError> {
        {
            let mut state = self.state();
            state.draft.rating = rating;
            state.draft.comments = comments.unwrap_or_default().to_string();
        }
        self.submit_feedback().await
    }

    /// Submits the pending rating for the current artifact. On success the
    /// draft is reset and a statistics refresh is started in the background;
    /// on failure the draft is kept for a retry.
    pub async fn submit_feedback(&self) -> Result<FeedbackAck, WorkflowError> {
        let pending = self.begin_feedback()?;
        self.finish_feedback(pending).await
    }

    pub fn spawn_feedback(&self) -> Result<JoinHandle<Result<FeedbackAck, WorkflowError>>, WorkflowError> {
        let pending = self.begin_feedback()?;
        let workflow = self.clone();
        Ok(tokio::spawn(async move { workflow.finish_feedback(pending).await }))
    }

    fn begin_feedback(&self) -> Result<PendingFeedback, WorkflowError> {
        let Some(guard) = self.inner.submitting_feedback.try_acquire() else {
            tracing::debug!("feedback rejected: another submission is in flight");
            return Err(WorkflowError::FeedbackInFlight);
        };

        let built = {
            let state = self.state();
            match (state.session.artifact_id(), Rating::new(state.draft.rating)) {
                (None, _) => Err(WorkflowError::NoArtifact),
                (Some(_), None) => Err(WorkflowError::MissingRating),
                (Some(id), Some(rating)) => {
                    Ok(FeedbackRequest::new(id.clone(), rating, &state.draft.comments))
                }
            }
        };

        match built {
            Ok(request) => Ok(PendingFeedback { request, action_id: new_action_id(), _guard: guard }),
            Err(err) => {
                self.set_status(WorkflowStatus::Error(err.status_message()));
                Err(err)
            }
        }
    }

    async fn finish_feedback(&self, pending: PendingFeedback) -> Result<FeedbackAck, WorkflowError> {
        let span = tracing::info_span!(
            "feedback",
            action_id = %pending.action_id,
            artifact_id = %pending.request.artifact_id
        );
        let outcome = self.inner.service
            .submit_feedback(&pending.request)
            .instrument(span.clone())
            .await;

        match outcome {
            Ok(ack) => {
                span.in_scope(|| {
                    tracing::info!(rating = pending.request.rating.get(), feedback_id = ?ack.feedback_id, "feedback accepted");
                });
                self.set_status(WorkflowStatus::Success(FEEDBACK_THANKS.to_string()));
                self.state().draft = FeedbackDraft::default();
                drop(pending);
                span.in_scope(|| self.spawn_refresh_statistics());
                Ok(ack)
            }
            Err(e) => {
                span.in_scope(|| tracing::warn!(error = %e, "feedback submission failed"));
                let err = WorkflowError::from(e);
                self.set_status(WorkflowStatus::Error(err.status_message()));
                Err(err)
            }
        }
    }
}
