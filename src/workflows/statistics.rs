use tracing::Instrument;

use crate::models::StatisticsSnapshot;
use crate::workflows::Workflow;

impl Workflow {
    /// Best-effort fetch of aggregate usage statistics. A failure is logged
    /// and leaves the previous snapshot in place; the status line is never
    /// touched.
    pub async fn refresh_statistics(&self) -> Option<StatisticsSnapshot> {
        let _serial = self.inner.refreshing.lock().await;

        match self.inner.service.statistics().await {
            Ok(snapshot) => {
                tracing::debug!(
                    total_prompts = snapshot.total_prompts,
                    total_feedback = snapshot.total_feedback,
                    "statistics refreshed"
                );
                self.state().statistics = Some(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch statistics");
                None
            }
        }
    }

    /// Runs [`Workflow::refresh_statistics`] on a spawned task and returns
    /// at once. A refresh it replaces keeps running detached.
    pub fn spawn_refresh_statistics(&self) {
        let workflow = self.clone();
        let handle = tokio::spawn(
            async move { workflow.refresh_statistics().await }.in_current_span(),
        );
        *self.last_refresh() = Some(handle);
    }

    /// Waits for the most recently spawned refresh and returns its snapshot.
    /// `None` when nothing is pending or the refresh failed.
    pub async fn settle_statistics(&self) -> Option<StatisticsSnapshot> {
        let handle = self.last_refresh().take()?;
        handle.await.ok().flatten()
    }
}
