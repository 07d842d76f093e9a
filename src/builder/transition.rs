//! Builder for constructing transition rules.

use crate::builder::error::BuildError;
use crate::core::{AnyTransition, Guard, State, Transition};

/// Builder for constructing transitions with a fluent API.
///
/// `.from(state)` restricts the edge to one source state by folding an
/// equality check into its condition.
pub struct TransitionBuilder<S: State> {
    from: Option<S>,
    to: Option<S>,
    guard: Option<Guard<S>>,
}

impl<S: State> TransitionBuilder<S> {
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            guard: None,
        }
    }

    /// Only fire from this state (optional).
    pub fn from(mut self, state: S) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: S) -> Self {
        self.to = Some(state);
        self
    }

    /// Add a guard (optional). Repeated calls must all pass.
    pub fn guard(mut self, guard: Guard<S>) -> Self {
        self.guard = Some(match self.guard.take() {
            Some(existing) => existing.and(guard),
            None => guard,
        });
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    fn parts(self) -> Result<(S, Guard<S>), BuildError> {
        let to = self.to.ok_or(BuildError::MissingTargetState)?;
        let mut condition = self.guard.unwrap_or_else(Guard::always);
        if let Some(from) = self.from {
            condition = Guard::new(move |current: &S| *current == from).and(condition);
        }
        Ok((to, condition))
    }

    /// Build a plain transition.
    pub fn build(self) -> Result<Transition<S>, BuildError> {
        let (to, condition) = self.parts()?;
        Ok(Transition::new(to, condition))
    }

    /// Build a wildcard transition, which never fires from its own target.
    pub fn build_any(self) -> Result<AnyTransition<S>, BuildError> {
        let (to, condition) = self.parts()?;
        Ok(AnyTransition::new(to, condition))
    }
}

impl<S: State> Default for TransitionBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
