//! Conditions guarding transitions.
//!
//! Conditions are pure boolean predicates evaluated synchronously against
//! the machine's current state. Any `Fn(&S) -> bool` closure is a condition;
//! [`Guard`] wraps one behind a shareable handle and adds combinators.

use super::state::State;
use std::fmt;
use std::sync::Arc;

/// Pure predicate over the current state.
pub trait Condition<S: State>: Send + Sync {
    /// Evaluate the condition against `current`.
    fn evaluate(&self, current: &S) -> bool;
}

impl<S, F> Condition<S> for F
where
    S: State,
    F: Fn(&S) -> bool + Send + Sync,
{
    fn evaluate(&self, current: &S) -> bool {
        self(current)
    }
}

/// Condition that always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Always;

impl<S: State> Condition<S> for Always {
    fn evaluate(&self, _current: &S) -> bool {
        true
    }
}

/// Condition that never holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Never;

impl<S: State> Condition<S> for Never {
    fn evaluate(&self, _current: &S) -> bool {
        false
    }
}

/// Shared, immutable condition handle.
///
/// Cloning a guard shares the underlying predicate, so one guard may back
/// any number of transitions.
///
/// # Example
///
/// ```rust
/// use gearshift::core::{Guard, State};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Phase {
///     Draft,
///     Review,
///     Published,
/// }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Draft => "Draft",
///             Self::Review => "Review",
///             Self::Published => "Published",
///         }
///     }
/// }
///
/// let editable = Guard::new(|p: &Phase| matches!(p, Phase::Draft | Phase::Review));
/// let reviewing = Guard::new(|p: &Phase| matches!(p, Phase::Review));
///
/// assert!(editable.check(&Phase::Draft));
/// assert!(!editable.clone().and(reviewing.clone()).check(&Phase::Draft));
/// assert!(reviewing.not().check(&Phase::Published));
/// ```
pub struct Guard<S: State> {
    condition: Arc<dyn Condition<S>>,
}

impl<S: State> Guard<S> {
    /// Create a guard from a pure predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::from_condition(predicate)
    }

    /// Wrap any condition in a guard.
    pub fn from_condition<C>(condition: C) -> Self
    where
        C: Condition<S> + 'static,
    {
        Guard {
            condition: Arc::new(condition),
        }
    }

    /// Guard that always passes.
    pub fn always() -> Self {
        Self::from_condition(Always)
    }

    /// Evaluate the guard against `state`.
    pub fn check(&self, state: &S) -> bool {
        self.condition.evaluate(state)
    }

    /// Both guards must pass. `other` is not evaluated when `self` fails.
    pub fn and(self, other: Guard<S>) -> Self {
        Self::new(move |s: &S| self.check(s) && other.check(s))
    }

    /// Either guard must pass. `other` is not evaluated when `self` passes.
    pub fn or(self, other: Guard<S>) -> Self {
        Self::new(move |s: &S| self.check(s) || other.check(s))
    }

    /// Invert the guard.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(move |s: &S| !self.check(s))
    }
}

impl<S: State> Condition<S> for Guard<S> {
    fn evaluate(&self, current: &S) -> bool {
        self.check(current)
    }
}

impl<S: State> Clone for Guard<S> {
    fn clone(&self) -> Self {
        Self {
            condition: Arc::clone(&self.condition),
        }
    }
}

impl<S: State> fmt::Debug for Guard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
