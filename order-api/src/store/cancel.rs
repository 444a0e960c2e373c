//! Cancellation and deadlines for repository calls.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{Result, StoreError};

/// A cancellation token that fires once a timeout elapses.
///
/// Dropping the deadline stops its timer; the token stays usable but will no
/// longer fire on its own.
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Start a deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let fire = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            fire.cancel();
        });
        Self { token, timer }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Drive `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    op: &'static str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled { op }),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_fires_after_timeout() {
        let deadline = Deadline::after(Duration::from_millis(10));
        assert!(!deadline.token().is_cancelled());
        tokio::time::timeout(Duration::from_secs(2), deadline.token().cancelled())
            .await
            .expect("deadline never fired");
    }

    #[tokio::test]
    async fn dropped_deadline_stops_timer() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let token = deadline.token().clone();
        drop(deadline);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_ready_future() {
        let token = CancellationToken::new();
        token.cancel();

        let res = cancellable(&token, "find_by_id", async { Ok(1) }).await;
        assert!(matches!(res, Err(StoreError::Cancelled { op: "find_by_id" })));
    }

    #[tokio::test]
    async fn live_token_passes_result_through() {
        let token = CancellationToken::new();
        assert_eq!(cancellable(&token, "get", async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let res: Result<()> = cancellable(&token, "find_all", std::future::pending()).await;
        assert!(matches!(res, Err(StoreError::Cancelled { .. })));
    }
}
