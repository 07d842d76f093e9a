//! Sequence wrapper that waits before delegating.

use super::{Sequence, SequenceError};
use crate::core::State;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Waits `delay` before running the inner sequence, for exit/enter effects
/// that take time. Cancelling the scope during the wait aborts the
/// transition without consulting the inner sequence.
#[derive(Clone, Debug)]
pub struct DelayedSequence<Q> {
    inner: Q,
    delay: Duration,
}

impl<Q> DelayedSequence<Q> {
    pub fn new(inner: Q, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl<S, Q> Sequence<S> for DelayedSequence<Q>
where
    S: State,
    Q: Sequence<S>,
{
    async fn run(
        &self,
        current: S,
        requested: S,
        scope: CancellationToken,
    ) -> Result<S, SequenceError> {
        tokio::select! {
            biased;
            _ = scope.cancelled() => return Err(SequenceError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }
        self.inner.run(current, requested, scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::DirectSequence;
    use std::time::Instant;

    #[derive(Clone, PartialEq, Debug)]
    enum Valve {
        Shut,
        Open,
    }

    impl State for Valve {
        fn name(&self) -> &str {
            match self {
                Self::Shut => "Shut",
                Self::Open => "Open",
            }
        }
    }

    #[tokio::test]
    async fn waits_then_delegates() {
        let sequence = DelayedSequence::new(DirectSequence, Duration::from_millis(20));
        let started = Instant::now();

        let next = sequence
            .run(Valve::Shut, Valve::Open, CancellationToken::new())
            .await;

        assert_eq!(next, Ok(Valve::Open));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_wait() {
        let sequence = DelayedSequence::new(DirectSequence, Duration::from_secs(60));
        let scope = CancellationToken::new();
        let trigger = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let next = sequence.run(Valve::Shut, Valve::Open, scope).await;

        assert_eq!(next, Err(SequenceError::Cancelled));
    }
}
