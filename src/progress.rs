//! Progress reporting for long-running release steps

use async_trait::async_trait;

/// Receives operator-facing progress updates
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A step completed successfully
    async fn on_success(&self, message: &str);

    /// Informational message
    async fn on_message(&self, message: &str);

    /// Something went wrong but the release continues, or the operator
    /// needs to act
    async fn on_warning(&self, message: &str);

    /// A step failed
    async fn on_error(&self, message: &str);

    /// Waiting on the forge started (e.g. for a pull request merge)
    async fn on_wait_start(&self, _message: &str) {}

    /// Waiting on the forge finished
    async fn on_wait_end(&self) {}
}

/// Progress callback that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_success(&self, _message: &str) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_warning(&self, _message: &str) {}
    async fn on_error(&self, _message: &str) {}
}
