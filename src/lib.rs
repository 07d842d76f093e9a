//! Gearshift: a cancellable finite state machine runtime
//!
//! Gearshift keeps a machine's current state and moves it through a
//! pluggable, asynchronous transition strategy. Overlapping requests are
//! serialized: a newer request cancels the one in flight and waits for it to
//! settle, so transitions never overlap and the last request to begin wins.
//! Modules attached to the machine can veto and observe every step.
//!
//! # Core Concepts
//!
//! - **State**: any value implementing the `State` trait
//! - **Conditions & Transitions**: pure predicates and edges consumed by sequences
//! - **Sequence**: async strategy computing the next state under a cancellation scope
//! - **Module**: pluggable veto/observer, at most one per concrete type
//! - **StateMachine**: the orchestrator tying the above together
//!
//! # Example
//!
//! ```rust
//! use gearshift::prelude::*;
//! use gearshift::state_enum;
//! use std::sync::Arc;
//!
//! state_enum! {
//!     enum Door {
//!         Closed,
//!         Open,
//!         Locked,
//!     }
//! }
//!
//! /// Never lock an open door.
//! struct Interlock;
//!
//! impl Module<Door> for Interlock {
//!     fn allow_change_state(&self, candidate: &Door) -> bool {
//!         !matches!(candidate, Door::Locked)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let machine = MachineBuilder::new()
//!     .initial(Door::Closed)
//!     .module(Arc::new(Interlock))
//!     .build()
//!     .unwrap();
//! machine.run().unwrap();
//!
//! machine.change_state(Door::Open, CancellationToken::new()).await.unwrap();
//! let refused = machine.change_state(Door::Locked, CancellationToken::new()).await;
//!
//! assert!(matches!(refused, Err(MachineError::Vetoed { .. })));
//! assert_eq!(machine.current_state(), Door::Open);
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod machine;
pub mod module;
pub mod sequence;

// Re-export commonly used types
pub use crate::core::{AnyTransition, Condition, Guard, State, StateChange, Transition};
pub use machine::{MachineError, StateMachine};
pub use module::Module;
pub use sequence::Sequence;
pub use tokio_util::sync::CancellationToken;

/// Everything needed to define states, modules and sequences.
pub mod prelude {
    pub use crate::builder::{MachineBuilder, TransitionBuilder};
    pub use crate::core::{
        AnyTransition, Condition, Guard, State, StateChange, Transition, TransitionRule,
    };
    pub use crate::machine::{MachineError, Operation, StateMachine};
    pub use crate::module::{Module, ModuleError, ModuleLink};
    pub use crate::sequence::{DirectSequence, RuleSequence, Sequence, SequenceError};
    pub use async_trait::async_trait;
    pub use tokio_util::sync::CancellationToken;
}
