//! Core State trait for state machine states.
//!
//! All state machine states must implement this trait, which provides
//! pure methods for inspecting state properties without side effects.

use std::fmt::Debug;

/// Trait for state machine states.
///
/// States are plain values owned by the machine while current. A
/// [`Sequence`](crate::sequence::Sequence) may construct new states, the
/// machine clones them out for queries and events.
///
/// # Required Traits
///
/// - `Clone`: the current state is handed out by value
/// - `PartialEq`: states are compared by transitions and queries
/// - `Debug`: states appear in diagnostics
/// - `Send` + `Sync` + `'static`: states cross task boundaries
///
/// # Example
///
/// ```rust
/// use gearshift::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum DoorState {
///     Closed,
///     Open,
///     Locked,
/// }
///
/// impl State for DoorState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Closed => "Closed",
///             Self::Open => "Open",
///             Self::Locked => "Locked",
///         }
///     }
/// }
///
/// assert_eq!(DoorState::Locked.name(), "Locked");
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// The machine itself does not refuse to leave a final state; sequences
    /// may consult this flag.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check whether `other` is the same variant as `self`, ignoring any
    /// payload carried by the variant.
    ///
    /// For non-enum states every value is the same variant.
    fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    enum TestState {
        Idle,
        Loading { progress: u8 },
        Done,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Loading { .. } => "Loading",
                Self::Done => "Done",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Done)
        }
    }

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(TestState::Idle.name(), "Idle");
        assert_eq!(TestState::Loading { progress: 3 }.name(), "Loading");
        assert_eq!(TestState::Done.name(), "Done");
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        assert!(!TestState::Idle.is_final());
        assert!(!TestState::Loading { progress: 0 }.is_final());
        assert!(TestState::Done.is_final());
    }

    #[test]
    fn same_variant_ignores_payload() {
        let early = TestState::Loading { progress: 10 };
        let late = TestState::Loading { progress: 90 };

        assert!(early.same_variant(&late));
        assert_ne!(early, late);
        assert!(!early.same_variant(&TestState::Idle));
    }
}
