//! Declarative transition edges.
//!
//! A transition pairs a target state with a guarding condition. Transitions
//! are consumed by sequences such as
//! [`RuleSequence`](crate::sequence::RuleSequence); the machine itself never
//! validates them.

use super::condition::{Condition, Guard};
use super::state::State;

/// Edge that a sequence may follow.
pub trait TransitionRule<S: State>: Send + Sync {
    /// State this edge leads to.
    fn target(&self) -> &S;

    /// Whether the edge may fire while the machine is in `current` (pure).
    fn validate(&self, current: &S) -> bool;
}

/// Edge to a fixed target, guarded by a condition.
///
/// # Example
///
/// ```rust
/// use gearshift::core::{State, Transition, TransitionRule};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Light { Red, Green }
///
/// impl State for Light {
///     fn name(&self) -> &str {
///         match self {
///             Self::Red => "Red",
///             Self::Green => "Green",
///         }
///     }
/// }
///
/// let go = Transition::when(Light::Green, |s: &Light| matches!(s, Light::Red));
/// assert!(go.validate(&Light::Red));
/// assert!(!go.validate(&Light::Green));
/// ```
#[derive(Clone, Debug)]
pub struct Transition<S: State> {
    to: S,
    condition: Guard<S>,
}

impl<S: State> Transition<S> {
    /// Create an edge to `to` guarded by `condition`.
    pub fn new(to: S, condition: Guard<S>) -> Self {
        Self { to, condition }
    }

    /// Create an edge guarded by a closure.
    pub fn when<F>(to: S, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::new(to, Guard::new(predicate))
    }

    /// Create an edge that is valid from every state.
    pub fn unconditional(to: S) -> Self {
        Self::new(to, Guard::always())
    }

    pub fn condition(&self) -> &Guard<S> {
        &self.condition
    }
}

impl<S: State> TransitionRule<S> for Transition<S> {
    fn target(&self) -> &S {
        &self.to
    }

    fn validate(&self, current: &S) -> bool {
        self.condition.evaluate(current)
    }
}

/// Wildcard edge: fires from any state except its own target.
///
/// The self-loop check runs before the condition, so the condition never
/// sees the target state.
#[derive(Clone, Debug)]
pub struct AnyTransition<S: State> {
    inner: Transition<S>,
}

impl<S: State> AnyTransition<S> {
    pub fn new(to: S, condition: Guard<S>) -> Self {
        Self {
            inner: Transition::new(to, condition),
        }
    }

    pub fn when<F>(to: S, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::new(to, Guard::new(predicate))
    }

    pub fn unconditional(to: S) -> Self {
        Self::new(to, Guard::always())
    }

    pub fn condition(&self) -> &Guard<S> {
        self.inner.condition()
    }
}

impl<S: State> TransitionRule<S> for AnyTransition<S> {
    fn target(&self) -> &S {
        self.inner.target()
    }

    fn validate(&self, current: &S) -> bool {
        if current == self.inner.target() {
            return false;
        }
        self.inner.validate(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone, PartialEq, Debug)]
    enum TestState {
        Start,
        Middle,
        End,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Start => "Start",
                Self::Middle => "Middle",
                Self::End => "End",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::End)
        }
    }

    #[test]
    fn validate_defers_to_condition() {
        let transition = Transition::when(TestState::End, |s: &TestState| {
            matches!(s, TestState::Middle)
        });

        assert_eq!(transition.target(), &TestState::End);
        assert!(transition.validate(&TestState::Middle));
        assert!(!transition.validate(&TestState::Start));
    }

    #[test]
    fn plain_transition_allows_self_loop() {
        let transition = Transition::unconditional(TestState::Middle);

        assert!(transition.validate(&TestState::Middle));
    }

    #[test]
    fn any_transition_rejects_its_own_target() {
        let transition = AnyTransition::unconditional(TestState::End);

        assert!(!transition.validate(&TestState::End));
        assert!(transition.validate(&TestState::Start));
        assert!(transition.validate(&TestState::Middle));
    }

    #[test]
    fn any_transition_uses_condition_for_other_states() {
        let transition =
            AnyTransition::when(TestState::End, |s: &TestState| matches!(s, TestState::Start));

        assert!(transition.validate(&TestState::Start));
        assert!(!transition.validate(&TestState::Middle));
    }

    #[test]
    fn any_transition_skips_condition_on_self_loop() {
        let evaluated = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&evaluated);
        let transition = AnyTransition::when(TestState::Middle, move |_: &TestState| {
            flag.store(true, Ordering::SeqCst);
            true
        });

        assert!(!transition.validate(&TestState::Middle));
        assert!(!evaluated.load(Ordering::SeqCst));
    }
}
