//! # Task Launcher
//!
//! Detaches background work from the caller while still handing back a
//! [`JobHandle`]. The default policy never awaits the handle; tests and
//! hosts that want determinism or cancellation can.

use crate::error::{PromotionError, Result};
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

pub trait TaskLauncher: Send + Sync {
    fn launch(&self, task: BoxFuture<'static, ()>) -> Result<JobHandle>;
}

/// Handle to a launched batch run
#[derive(Debug)]
pub struct JobHandle {
    inner: JoinHandle<()>,
}

impl JobHandle {
    pub fn new(inner: JoinHandle<()>) -> Self {
        Self { inner }
    }

    /// Stop the run at its next suspension point
    pub fn abort(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the run to end
    pub async fn join(self) -> Result<()> {
        self.inner
            .await
            .map_err(|error| PromotionError::TaskLaunch(error.to_string()))
    }
}

/// Spawns onto the ambient Tokio runtime
#[derive(Debug, Clone, Default)]
pub struct TokioTaskLauncher;

impl TaskLauncher for TokioTaskLauncher {
    fn launch(&self, task: BoxFuture<'static, ()>) -> Result<JobHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| PromotionError::TaskLaunch(error.to_string()))?;
        Ok(JobHandle::new(runtime.spawn(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_launch_and_join() {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        let handle = TokioTaskLauncher
            .launch(Box::pin(async move {
                let _ = sender.send(42);
            }))
            .unwrap();

        handle.join().await.unwrap();
        assert_eq!(receiver.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_abort_surfaces_on_join() {
        let handle = TokioTaskLauncher
            .launch(Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }))
            .unwrap();

        handle.abort();
        assert!(matches!(
            handle.join().await,
            Err(PromotionError::TaskLaunch(_))
        ));
    }

    #[test]
    fn test_launch_outside_runtime_fails() {
        let result = TokioTaskLauncher.launch(Box::pin(async {}));
        assert!(matches!(result, Err(PromotionError::TaskLaunch(_))));
    }
}
