//! Cooperative cancellation for blocking work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag checked by long-running blocking loops.
///
/// The async side cancels it when its deadline expires or when its future
/// is dropped (see [`drop_guard`](CancellationToken::drop_guard)); the
/// blocking side polls [`is_cancelled`](CancellationToken::is_cancelled)
/// once per step.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Guard that cancels this token when dropped.
    pub fn drop_guard(self) -> DropGuard {
        DropGuard { token: self }
    }
}

/// Cancels its token on drop, including when the owning future is dropped
/// before completion.
#[derive(Debug)]
pub struct DropGuard {
    token: CancellationToken,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn dropping_guard_cancels() {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn abandoned_future_cancels_its_token() {
        let token = CancellationToken::new();
        let observer = token.clone();
        let pending = async move {
            let _guard = token.drop_guard();
            std::future::pending::<()>().await;
        };
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(outcome.is_err());
        assert!(observer.is_cancelled());
    }
}
