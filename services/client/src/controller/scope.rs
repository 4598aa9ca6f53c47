//! services/client/src/controller/scope.rs
//!
//! Ties the lifetime of in-flight operations to the screen that started them.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// One per screen instance. Closing the scope cancels every operation run
/// through it; their results are discarded rather than applied.
#[derive(Clone, Debug, Default)]
pub struct ScreenScope {
    token: CancellationToken,
}

impl ScreenScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// A child token for background tasks that should stop with the screen.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub(crate) fn close(&self) {
        self.token.cancel();
    }

    /// Runs `operation` unless the screen closes first.
    ///
    /// Returns `None` if the scope was closed before or while the operation
    /// was pending, even if the operation itself completed.
    pub async fn run<F: Future>(&self, operation: F) -> Option<F::Output> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            output = operation => self.is_active().then_some(output),
        }
    }
}
