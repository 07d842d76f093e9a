//! Build errors for machine and transition builders.

use crate::checkpoint::SnapshotError;
use crate::machine::MachineError;
use thiserror::Error;

/// Errors that can occur when building machines and transitions.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) or .resume(snapshot) before .build()")]
    MissingInitialState,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingTargetState,

    #[error("Event capacity must be greater than zero")]
    ZeroEventCapacity,

    #[error("Module could not be attached: {0}")]
    Module(#[from] MachineError),

    #[error("Snapshot cannot be resumed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Configured modules {found:?} do not match the snapshot's {expected:?}")]
    ModuleMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}
