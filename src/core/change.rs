//! Record of a committed state change.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Record of a single committed state change.
///
/// Published on the machine's state-changed channel after the current state
/// has been updated and every module has been notified.
///
/// # Example
///
/// ```rust
/// use gearshift::core::{State, StateChange};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Task { Pending, Running }
///
/// impl State for Task {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "Pending",
///             Self::Running => "Running",
///         }
///     }
/// }
///
/// let change = StateChange {
///     from: Task::Pending,
///     to: Task::Running,
///     timestamp: Utc::now(),
///     ticket: 1,
/// };
/// assert!(!change.is_self_loop());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: DeserializeOwned"))]
pub struct StateChange<S: State> {
    /// The state that was current before the change
    pub from: S,
    /// The state that is current now
    pub to: S,
    /// When the change committed
    pub timestamp: DateTime<Utc>,
    /// Number of the `change_state` request that produced this change,
    /// counted per machine from 1
    pub ticket: u64,
}

impl<S: State> StateChange<S> {
    /// Whether the change re-entered the state it left.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum WorkState {
        Start,
        End,
    }

    impl State for WorkState {
        fn name(&self) -> &str {
            match self {
                Self::Start => "Start",
                Self::End => "End",
            }
        }
    }

    #[test]
    fn self_loop_detection() {
        let change = StateChange {
            from: WorkState::Start,
            to: WorkState::Start,
            timestamp: Utc::now(),
            ticket: 4,
        };
        assert!(change.is_self_loop());
    }

    #[test]
    fn change_serializes_when_state_does() {
        let change = StateChange {
            from: WorkState::Start,
            to: WorkState::End,
            timestamp: Utc::now(),
            ticket: 2,
        };

        let json = serde_json::to_string(&change).unwrap();
        let back: StateChange<WorkState> = serde_json::from_str(&json).unwrap();

        assert_eq!(back, change);
    }
}
