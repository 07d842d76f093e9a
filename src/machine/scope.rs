//! Cancellation scope of a single transition.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cancellation scope linked to two parents: the machine's running scope
/// and the caller's token.
///
/// The running scope is a true parent (the scope is its child token), so
/// stopping the machine cancels every transition at once. The caller's token
/// is bridged while the transition is being driven through [`guard`].
///
/// [`guard`]: TransitionScope::guard
#[derive(Debug)]
pub struct TransitionScope {
    token: CancellationToken,
    caller: CancellationToken,
}

impl TransitionScope {
    /// Derive a scope from `running`, linked to `caller`.
    pub fn link(running: &CancellationToken, caller: CancellationToken) -> Self {
        let token = running.child_token();
        if caller.is_cancelled() {
            token.cancel();
        }
        Self { token, caller }
    }

    /// Token handed to the sequence.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancelled through either parent or directly.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.caller.is_cancelled()
    }

    /// Drive `fut` to completion, cancelling the scope if the caller's token
    /// fires first. `fut` keeps running after that so it can wind down.
    pub async fn guard<F: Future>(&self, fut: F) -> F::Output {
        tokio::pin!(fut);
        tokio::select! {
            biased;
            output = &mut fut => return output,
            _ = self.caller.cancelled() => self.token.cancel(),
        }
        fut.await
    }
}
