//! Transition strategies.
//!
//! A [`Sequence`] decides which state becomes current when the machine is
//! asked to change state. It receives the current state, the requested state
//! and the transition's cancellation scope, and may suspend arbitrarily while
//! it works. The machine treats the returned state as authoritative.
//!
//! # Cancellation
//!
//! The scope is cancelled when the request is superseded by a newer one,
//! when the machine stops, or when the caller cancels its own token.
//! Sequences should notice promptly and return [`SequenceError::Cancelled`].
//! A state returned after cancellation is discarded.

mod delayed;
mod direct;
mod rules;

pub use delayed::DelayedSequence;
pub use direct::DirectSequence;
pub use rules::RuleSequence;

use crate::core::State;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a sequence may report instead of a state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Transition cancelled")]
    Cancelled,

    #[error("No transition from '{from}' to '{to}'")]
    Rejected { from: String, to: String },

    #[error("Sequence failed: {0}")]
    Failed(String),
}

/// Strategy computing the next current state.
///
/// Implementations must not touch the machine they serve; everything they
/// need arrives as arguments.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use gearshift::core::State;
/// use gearshift::sequence::{Sequence, SequenceError};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Level { Low, High }
///
/// impl State for Level {
///     fn name(&self) -> &str {
///         match self {
///             Self::Low => "Low",
///             Self::High => "High",
///         }
///     }
/// }
///
/// /// Only ever steps up.
/// struct Ratchet;
///
/// #[async_trait]
/// impl Sequence<Level> for Ratchet {
///     async fn run(
///         &self,
///         current: Level,
///         requested: Level,
///         scope: CancellationToken,
///     ) -> Result<Level, SequenceError> {
///         if scope.is_cancelled() {
///             return Err(SequenceError::Cancelled);
///         }
///         Ok(if current == Level::High { current } else { requested })
///     }
/// }
/// ```
#[async_trait]
pub trait Sequence<S: State>: Send + Sync {
    async fn run(
        &self,
        current: S,
        requested: S,
        scope: CancellationToken,
    ) -> Result<S, SequenceError>;
}

#[async_trait]
impl<S, Q> Sequence<S> for Arc<Q>
where
    S: State,
    Q: Sequence<S> + ?Sized,
{
    async fn run(
        &self,
        current: S,
        requested: S,
        scope: CancellationToken,
    ) -> Result<S, SequenceError> {
        (**self).run(current, requested, scope).await
    }
}
