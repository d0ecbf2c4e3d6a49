//! 可取消的等待

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// 等待 `fut` 完成；令牌先被取消时丢弃 `fut` 并返回 None
///
/// 已取消的令牌优先，不会再轮询 `fut`
pub async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        assert_eq!(until_cancelled(&cancel, async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_cancelled_token_wins_over_ready_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(until_cancelled(&cancel, async { 7 }).await, None);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_long_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = until_cancelled(&cancel, tokio::time::sleep(Duration::from_secs(60))).await;

        assert_eq!(result, None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
