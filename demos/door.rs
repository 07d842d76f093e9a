//! Motorized Door
//!
//! This example drives a door through a slow motor sequence while an
//! interlock module vetoes unsafe moves.
//!
//! Key concepts:
//! - Rule-driven sequence wrapped in a cancellable delay
//! - Module vetoes and notifications
//! - A newer request superseding the one in flight
//! - Snapshots for resuming after a restart
//!
//! Run with: cargo run --example door
//! Set RUST_LOG=gearshift=debug to watch the machine's own logging.

use gearshift::builder::simple_transition;
use gearshift::prelude::*;
use gearshift::sequence::DelayedSequence;
use gearshift::state_enum;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

state_enum! {
    enum Door {
        Closed,
        Opening,
        Open,
        Closing,
        Locked,
    }
}

/// Refuses to lock or move the door while someone stands in the doorway.
#[derive(Default)]
struct Interlock {
    obstructed: AtomicBool,
}

impl Module<Door> for Interlock {
    fn name(&self) -> &str {
        "interlock"
    }

    fn allow_change_state(&self, candidate: &Door) -> bool {
        let blocked = self.obstructed.load(Ordering::SeqCst);
        !(blocked && matches!(candidate, Door::Closing | Door::Locked))
    }

    fn on_state_changed(&self, state: &Door) {
        println!("  [interlock] door is now {}", state.name());
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Motorized Door ===\n");

    let motor = RuleSequence::new()
        .with_rule(simple_transition(Door::Closed, Door::Opening))
        .with_rule(simple_transition(Door::Opening, Door::Open))
        .with_rule(simple_transition(Door::Opening, Door::Closing))
        .with_rule(simple_transition(Door::Open, Door::Closing))
        .with_rule(simple_transition(Door::Closing, Door::Closed))
        .with_rule(simple_transition(Door::Closing, Door::Opening))
        .with_rule(simple_transition(Door::Closed, Door::Locked))
        .with_rule(simple_transition(Door::Locked, Door::Closed));

    let interlock = Arc::new(Interlock::default());
    let machine = MachineBuilder::new()
        .initial(Door::Closed)
        .label("front-door")
        .sequence(DelayedSequence::new(motor, Duration::from_millis(50)))
        .module(Arc::clone(&interlock))
        .build()
        .unwrap();
    machine.run().unwrap();

    println!("1. Opening the door");
    let opened = match machine.change_state(Door::Opening, CancellationToken::new()).await {
        Ok(_) => machine.change_state(Door::Open, CancellationToken::new()).await,
        Err(error) => Err(error),
    };
    println!("   result: {:?}\n", opened);

    println!("2. Locking an open door is not a declared move");
    let result = machine.change_state(Door::Locked, CancellationToken::new()).await;
    println!("   result: {:?}\n", result);

    println!("3. Someone steps into the doorway");
    interlock.obstructed.store(true, Ordering::SeqCst);
    let result = machine.change_state(Door::Closing, CancellationToken::new()).await;
    println!("   result: {:?}\n", result);
    interlock.obstructed.store(false, Ordering::SeqCst);

    println!("4. Closing, then changing our mind halfway");
    let result = machine.change_state(Door::Closing, CancellationToken::new()).await;
    println!("   closing: {:?}", result);
    let closed = tokio::spawn(machine.change_state(Door::Closed, CancellationToken::new()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let reopened = machine.change_state(Door::Opening, CancellationToken::new()).await;
    println!("   closed:  {:?}", closed.await.unwrap());
    println!("   opening: {:?}\n", reopened);

    println!("5. Snapshot for the next boot");
    let snapshot = machine.snapshot();
    println!("{}\n", snapshot.to_json().unwrap());

    machine.stop().unwrap();
    let resumed = MachineBuilder::new()
        .resume(snapshot)
        .unwrap()
        .module(Arc::new(Interlock::default()))
        .build()
        .unwrap();
    println!(
        "   resumed in {} (running: {})",
        resumed.current_state().name(),
        resumed.is_running()
    );

    println!("\n=== Example Complete ===");
}
