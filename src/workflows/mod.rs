//! The generate → rate → refresh-statistics workflow.
//!
//! [`Workflow`] owns all client state: the artifact session, the pending
//! rating, the last statistics snapshot and the status line. Each kind of
//! service call is guarded by its own in-flight gate so at most one call of
//! that kind is outstanding.

pub mod error;
pub mod feedback;
pub mod generate;
pub mod session;
pub mod statistics;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::CodegenService;
use crate::models::*;

pub use error::{ErrorKind, WorkflowError};
pub use session::ArtifactSession;

#[derive(Debug, Default)]
pub(crate) struct WorkflowState {
    pub session: ArtifactSession,
    pub draft: FeedbackDraft,
    pub statistics: Option<StatisticsSnapshot>,
}

/// Set while a call of one kind is outstanding.
#[derive(Debug, Default, Clone)]
pub(crate) struct InFlightGate(Arc<AtomicBool>);

impl InFlightGate {
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped, including on error or panic.
#[derive(Debug)]
pub(crate) struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    service: Arc<dyn CodegenService>,
    state: Mutex<WorkflowState>,
    status: watch::Sender<WorkflowStatus>,
    generating: InFlightGate,
    submitting_feedback: InFlightGate,
    refreshing: tokio::sync::Mutex<()>,
    last_refresh: Mutex<Option<JoinHandle<Option<StatisticsSnapshot>>>>,
}

/// Cloneable handle to one workflow instance.
#[derive(Clone)]
pub struct Workflow {
    inner: Arc<Inner>,
}

impl Workflow {
    pub fn new(service: Arc<dyn CodegenService>) -> Self {
        let (status, _) = watch::channel(WorkflowStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                service,
                state: Mutex::new(WorkflowState::default()),
                status,
                generating: InFlightGate::default(),
                submitting_feedback: InFlightGate::default(),
                refreshing: tokio::sync::Mutex::new(()),
                last_refresh: Mutex::new(None),
            }),
        }
    }

    /// Creates the workflow and launches the startup statistics refresh in
    /// the background. Must be called inside a tokio runtime.
    pub fn start(service: Arc<dyn CodegenService>) -> Self {
        let workflow = Self::new(service);
        workflow.spawn_refresh_statistics();
        workflow
    }

    pub fn service(&self) -> &Arc<dyn CodegenService> {
        &self.inner.service
    }

    pub fn status(&self) -> WorkflowStatus {
        self.inner.status.borrow().clone()
    }

    /// Receives every status overwrite.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.inner.status.subscribe()
    }

    pub fn artifact(&self) -> Option<GenerationResult> {
        self.state().session.current().cloned()
    }

    pub fn is_present(&self) -> bool {
        self.state().session.is_present()
    }

    pub fn draft(&self) -> FeedbackDraft {
        self.state().draft.clone()
    }

    pub fn set_rating(&self, rating: i64) {
        self.state().draft.rating = rating;
    }

    pub fn set_comments(&self, comments: impl Into<String>) {
        self.state().draft.comments = comments.into();
    }

    pub fn statistics(&self) -> Option<StatisticsSnapshot> {
        self.state().statistics.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.generating.is_set()
    }

    pub fn is_submitting_feedback(&self) -> bool {
        self.inner.submitting_feedback.is_set()
    }

    /// Drops the artifact, resets the pending rating and comments, and
    /// returns the status to idle. In-flight calls are not aborted.
    pub fn clear(&self) {
        self.reset_session();
        self.set_status(WorkflowStatus::Idle);
    }

    fn reset_session(&self) {
        let mut state = self.state();
        if let Some(old) = state.session.clear() {
            tracing::debug!(artifact_id = %old.artifact_id, "artifact discarded");
        }
        state.draft = FeedbackDraft::default();
    }

    pub(crate) fn set_status(&self, status: WorkflowStatus) {
        self.inner.status.send_replace(status);
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, WorkflowState> {
        // Every mutation is a single assignment; a poisoned lock still holds
        // consistent state.
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn last_refresh(&self) -> MutexGuard<'_, Option<JoinHandle<Option<StatisticsSnapshot>>>> {
        self.inner.last_refresh.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
