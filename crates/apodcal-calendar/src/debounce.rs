//! Cancellable, restartable delay.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Runs at most one task per burst of calls: each `schedule` cancels the
/// previously scheduled task, and a task only starts once `delay` has
/// passed without another `schedule`.
///
/// The task receives its generation's token. Once started it is not
/// aborted; it is expected to check the token before acting on results.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    parent: CancellationToken,
    current: Option<CancellationToken>,
}

impl Debouncer {
    /// Tokens handed out are children of `parent`; cancelling it cancels all.
    pub fn new(delay: Duration, parent: CancellationToken) -> Self {
        Self {
            delay,
            parent,
            current: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel the pending timer, or mark the running task as superseded.
    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(&mut self, task: F) -> CancellationToken
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel_pending();

        let token = self.parent.child_token();
        self.current = Some(token.clone());

        let delay = self.delay;
        let cancelled = token.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::trace!("Debounced task cancelled before it started");
                }
                _ = tokio::time::sleep(delay) => {
                    task(task_token).await;
                }
            }
        });

        token
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
