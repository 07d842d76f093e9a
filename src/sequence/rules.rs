//! Sequence driven by declarative transition rules.

use super::{Sequence, SequenceError};
use crate::core::{State, TransitionRule};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Admits a request only when some rule leads to the requested state and
/// validates from the current one.
///
/// Rules are consulted in insertion order; the first admitting rule wins.
///
/// # Example
///
/// ```rust
/// use gearshift::core::{AnyTransition, State, Transition};
/// use gearshift::sequence::RuleSequence;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Job { Queued, Running, Failed }
///
/// impl State for Job {
///     fn name(&self) -> &str {
///         match self {
///             Self::Queued => "Queued",
///             Self::Running => "Running",
///             Self::Failed => "Failed",
///         }
///     }
/// }
///
/// let rules = RuleSequence::new()
///     .with_rule(Transition::when(Job::Running, |s: &Job| matches!(s, Job::Queued)))
///     .with_rule(AnyTransition::unconditional(Job::Failed));
///
/// assert!(rules.admits(&Job::Queued, &Job::Running));
/// assert!(!rules.admits(&Job::Failed, &Job::Failed));
/// ```
pub struct RuleSequence<S: State> {
    rules: Vec<Arc<dyn TransitionRule<S>>>,
}

impl<S: State> RuleSequence<S> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule.
    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: TransitionRule<S> + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Add a shared rule.
    pub fn with_shared_rule(mut self, rule: Arc<dyn TransitionRule<S>>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule admits `current -> requested` (pure).
    pub fn admits(&self, current: &S, requested: &S) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.target() == requested && rule.validate(current))
    }
}

impl<S: State> Default for RuleSequence<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: State> Sequence<S> for RuleSequence<S> {
    async fn run(
        &self,
        current: S,
        requested: S,
        scope: CancellationToken,
    ) -> Result<S, SequenceError> {
        if scope.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }

        if self.admits(&current, &requested) {
            return Ok(requested);
        }

        debug!(
            from = current.name(),
            to = requested.name(),
            rules = self.rules.len(),
            "No transition rule admits request"
        );
        Err(SequenceError::Rejected {
            from: current.name().to_string(),
            to: requested.name().to_string(),
        })
    }
}
