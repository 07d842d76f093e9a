//! Sequence that accepts every request as-is.

use super::{Sequence, SequenceError};
use crate::core::State;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Moves straight to the requested state.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectSequence;

#[async_trait]
impl<S: State> Sequence<S> for DirectSequence {
    async fn run(
        &self,
        _current: S,
        requested: S,
        scope: CancellationToken,
    ) -> Result<S, SequenceError> {
        if scope.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }
        Ok(requested)
    }
}
