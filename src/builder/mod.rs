//! Builder API for ergonomic machine construction.
//!
//! This module provides fluent builders and macros for configuring machines
//! and transition rules with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use transition::TransitionBuilder;

use crate::core::{Guard, State, Transition};

/// Create an unconditional transition from one state to another.
///
/// # Example
///
/// ```
/// use gearshift::builder::simple_transition;
/// use gearshift::core::TransitionRule;
/// use gearshift::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         End,
///     }
///     final: [End]
/// }
///
/// let transition = simple_transition(MyState::Start, MyState::End);
/// assert!(transition.validate(&MyState::Start));
/// assert!(!transition.validate(&MyState::End));
/// ```
pub fn simple_transition<S: State>(from: S, to: S) -> Transition<S> {
    Transition::new(to, Guard::new(move |current: &S| *current == from))
}

/// Create a transition from one state to another with an extra guard.
///
/// # Example
///
/// ```
/// use gearshift::builder::guarded_transition;
/// use gearshift::core::{State, TransitionRule};
/// use gearshift::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         Middle,
///         End,
///     }
///     final: [End]
/// }
///
/// let transition = guarded_transition(MyState::Start, MyState::Middle, |s: &MyState| !s.is_final());
/// assert!(transition.validate(&MyState::Start));
/// ```
pub fn guarded_transition<S, F>(from: S, to: S, guard: F) -> Transition<S>
where
    S: State,
    F: Fn(&S) -> bool + Send + Sync + 'static,
{
    let source = Guard::new(move |current: &S| *current == from);
    Transition::new(to, source.and(Guard::new(guard)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionRule;

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
    fn simple_transition_builds() {
        let transition = simple_transition(TestState::Start, TestState::Middle);

        assert_eq!(transition.target(), &TestState::Middle);
        assert!(transition.validate(&TestState::Start));
        assert!(!transition.validate(&TestState::Middle));
    }

    #[test]
    fn guarded_transition_respects_guard() {
        let transition = guarded_transition(TestState::Start, TestState::Middle, |s: &TestState| {
            !s.is_final()
        });

        assert!(transition.validate(&TestState::Start));
        assert!(!transition.validate(&TestState::End));
    }

    #[test]
    fn guarded_transition_still_checks_source() {
        let transition = guarded_transition(TestState::Start, TestState::End, |_: &TestState| true);

        assert!(!transition.validate(&TestState::Middle));
    }
}
