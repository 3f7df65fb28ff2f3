use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally; nothing was sent.
    Validation,
    /// Rejected by the in-flight gate; nothing was sent.
    Busy,
    /// The service call failed or answered with a non-success status.
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Please select a rating between 1 and 5")]
    MissingRating,
    #[error("No code to rate")]
    NoArtifact,
    #[error("A generation is already in progress")]
    GenerationInFlight,
    #[error("A feedback submission is already in progress")]
    FeedbackInFlight,
    #[error(transparent)]
    Transport(#[from] ApiError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::EmptyPrompt | WorkflowError::MissingRating | WorkflowError::NoArtifact => {
                ErrorKind::Validation
            }
            WorkflowError::GenerationInFlight | WorkflowError::FeedbackInFlight => ErrorKind::Busy,
            WorkflowError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Status line text for this failure.
    pub fn status_message(&self) -> String {
        match self {
            WorkflowError::Transport(e) => format!("Error: {}", e),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(WorkflowError::EmptyPrompt.kind(), ErrorKind::Validation);
        assert_eq!(WorkflowError::NoArtifact.kind(), ErrorKind::Validation);
        assert_eq!(WorkflowError::FeedbackInFlight.kind(), ErrorKind::Busy);
        assert_eq!(WorkflowError::from(ApiError::Timeout).kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_transport_status_message() {
        let err = WorkflowError::from(ApiError::Api { status: 503, message: "model offline".into() });
        assert_eq!(err.status_message(), "Error: API error 503: model offline");
        assert_eq!(WorkflowError::NoArtifact.status_message(), "No code to rate");
    }
}
