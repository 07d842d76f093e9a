//! Core state machine types.
//!
//! This module contains the pure building blocks the runtime works with:
//! - State definitions via the `State` trait
//! - Conditions and guards controlling transitions
//! - Transition edges, including the wildcard variant
//! - The record published when a state change commits
//!
//! Everything here is synchronous and side-effect free.

mod change;
mod condition;
mod state;
mod transition;

pub use change::StateChange;
pub use condition::{Always, Condition, Guard, Never};
pub use state::State;
pub use transition::{AnyTransition, Transition, TransitionRule};
