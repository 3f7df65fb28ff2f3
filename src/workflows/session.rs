use crate::models::{ArtifactId, GenerationResult};

/// Holds at most one generated artifact.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSession {
    current: Option<GenerationResult>,
}

impl ArtifactSession {
    pub fn replace(&mut self, result: GenerationResult) {
        self.current = Some(result);
    }

    pub fn clear(&mut self) -> Option<GenerationResult> {
        self.current.take()
    }

    pub fn is_present(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&GenerationResult> {
        self.current.as_ref()
    }

    pub fn artifact_id(&self) -> Option<&ArtifactId> {
        self.current.as_ref().map(|r| &r.artifact_id)
    }
}
