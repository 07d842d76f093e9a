//! The state machine runtime.
//!
//! [`StateMachine`] owns the current state and serializes state changes:
//!
//! - A new `change_state` request cancels the in-flight one and waits for it
//!   to settle before its own sequence runs, so transitions never overlap
//!   and the last request to begin wins.
//! - Every transition runs in a [`TransitionScope`] linked to the machine's
//!   running scope and the caller's token.
//! - Modules are polled for vetoes in registration order before anything
//!   changes and notified after the change commits.

mod error;
#[allow(clippy::module_inception)]
mod machine;
mod registry;
mod scope;

pub use error::{MachineError, Operation};
pub use machine::{StateMachine, WeakMachine, DEFAULT_EVENT_CAPACITY};
pub use scope::TransitionScope;
