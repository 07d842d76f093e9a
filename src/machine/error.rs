//! Errors reported by the machine.

use crate::module::ModuleError;
use crate::sequence::SequenceError;
use std::fmt;
use thiserror::Error;

/// Machine operation named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Run,
    Stop,
    ChangeState,
    AddModule,
    RemoveModule,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Run => "run",
            Self::Stop => "stop",
            Self::ChangeState => "change state",
            Self::AddModule => "add module",
            Self::RemoveModule => "remove module",
        })
    }
}

/// Why a machine operation was abandoned.
///
/// Every variant except [`MachineError::Sequence`] leaves the machine
/// exactly as it was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("Machine is already running")]
    AlreadyRunning,

    #[error("Machine is not running")]
    NotRunning,

    #[error("Cannot {operation} while the machine is running")]
    Running { operation: Operation },

    #[error("Module '{module}' vetoed {operation}")]
    Vetoed { module: String, operation: Operation },

    #[error("A module of type '{module}' is already attached")]
    DuplicateModule { module: String },

    #[error("No module of type '{module}' is attached")]
    MissingModule { module: String },

    #[error("Module '{module}' refused to link to the machine")]
    LinkRefused { module: String },

    #[error(transparent)]
    Linkage(#[from] ModuleError),

    #[error("Transition cancelled")]
    Cancelled,

    #[error("No tokio runtime to drive the transition")]
    NoRuntime,

    #[error(transparent)]
    Sequence(SequenceError),
}

impl From<SequenceError> for MachineError {
    fn from(error: SequenceError) -> Self {
        match error {
            SequenceError::Cancelled => Self::Cancelled,
            other => Self::Sequence(other),
        }
    }
}

impl MachineError {
    /// Whether the error is a cancellation rather than a refusal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_cancellation_maps_to_cancelled() {
        let error: MachineError = SequenceError::Cancelled.into();
        assert!(error.is_cancelled());

        let error: MachineError = SequenceError::Failed("boom".to_string()).into();
        assert_eq!(
            error,
            MachineError::Sequence(SequenceError::Failed("boom".to_string()))
        );
    }

    #[test]
    fn veto_message_names_module_and_operation() {
        let error = MachineError::Vetoed {
            module: "Interlock".to_string(),
            operation: Operation::ChangeState,
        };

        assert_eq!(error.to_string(), "Module 'Interlock' vetoed change state");
    }
}
