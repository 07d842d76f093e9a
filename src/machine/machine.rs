//! The state machine orchestrator.

use crate::core::{State, StateChange};
use crate::machine::error::{MachineError, Operation};
use crate::machine::registry::{ModuleEntry, ModuleRegistry};
use crate::machine::scope::TransitionScope;
use crate::module::Module;
use crate::sequence::{Sequence, SequenceError};
use chrono::Utc;
use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capacity of the state-changed channel unless configured otherwise.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Handle to a state machine.
///
/// Handles are cheap to clone and all clones drive the same machine. The
/// current state, the module registry and the in-flight marker sit behind
/// one internal lock that is never held while module hooks or the sequence
/// run.
///
/// # Example
///
/// ```rust
/// use gearshift::core::State;
/// use gearshift::machine::StateMachine;
/// use gearshift::sequence::DirectSequence;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Light { Off, On }
///
/// impl State for Light {
///     fn name(&self) -> &str {
///         match self {
///             Self::Off => "Off",
///             Self::On => "On",
///         }
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let machine = StateMachine::new(Light::Off, DirectSequence);
/// machine.run().unwrap();
///
/// let now = machine.change_state(Light::On, CancellationToken::new()).await.unwrap();
///
/// assert_eq!(now, Light::On);
/// assert!(machine.is_in(&Light::On));
/// assert!(!machine.in_transition());
/// # }
/// ```
pub struct StateMachine<S: State> {
    shared: Arc<Shared<S>>,
}

/// Non-owning reference to a machine, held by linked modules.
pub struct WeakMachine<S: State> {
    shared: Weak<Shared<S>>,
}

struct Shared<S: State> {
    id: Uuid,
    label: String,
    sequence: Box<dyn Sequence<S>>,
    events: broadcast::Sender<StateChange<S>>,
    inner: Mutex<Inner<S>>,
}

struct Inner<S: State> {
    current: S,
    /// Present exactly while the machine is running.
    running: Option<CancellationToken>,
    modules: ModuleRegistry<S>,
    in_flight: Option<InFlight>,
    tickets: u64,
}

/// Marker for the most recently begun transition.
struct InFlight {
    ticket: u64,
    scope: CancellationToken,
    /// Closes once that transition has settled.
    settled: watch::Receiver<()>,
}

impl<S: State> StateMachine<S> {
    /// Create a stopped machine in `initial` using `sequence`.
    pub fn new<Q>(initial: S, sequence: Q) -> Self
    where
        Q: Sequence<S> + 'static,
    {
        Self::from_parts(initial, Box::new(sequence), None, DEFAULT_EVENT_CAPACITY)
    }

    /// `event_capacity` must be non-zero.
    pub(crate) fn from_parts(
        initial: S,
        sequence: Box<dyn Sequence<S>>,
        label: Option<String>,
        event_capacity: usize,
    ) -> Self {
        let id = Uuid::new_v4();
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            shared: Arc::new(Shared {
                id,
                label: label.unwrap_or_else(|| id.to_string()),
                sequence,
                events,
                inner: Mutex::new(Inner {
                    current: initial,
                    running: None,
                    modules: ModuleRegistry::new(),
                    in_flight: None,
                    tickets: 0,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    /// Whether a `change_state` request has begun and not yet settled.
    pub fn in_transition(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn current_state(&self) -> S {
        self.lock().current.clone()
    }

    /// Whether the current state equals `state`.
    pub fn is_in(&self, state: &S) -> bool {
        self.lock().current == *state
    }

    /// Whether the current state is the same variant as `other`, whatever
    /// the variants' payloads.
    pub fn in_state(&self, other: &S) -> bool {
        self.lock().current.same_variant(other)
    }

    /// Receive a [`StateChange`] for every committed transition.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange<S>> {
        self.shared.events.subscribe()
    }

    pub fn downgrade(&self) -> WeakMachine<S> {
        WeakMachine {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Current state, running flag and module names, read atomically.
    pub(crate) fn position(&self) -> (S, bool, Vec<String>) {
        let inner = self.lock();
        (
            inner.current.clone(),
            inner.running.is_some(),
            inner.modules.names(),
        )
    }

    /// Start the machine.
    ///
    /// Every module may veto, in registration order; the first refusal
    /// abandons the call. Modules are told the machine ran only after it is
    /// marked running.
    pub fn run(&self) -> Result<(), MachineError> {
        let modules = {
            let inner = self.lock();
            if inner.running.is_some() {
                warn!(machine = %self.label(), "Run requested but machine is already running");
                return Err(MachineError::AlreadyRunning);
            }
            inner.modules.handles()
        };

        if let Some(module) = modules.iter().find(|m| !m.allow_run_machine()) {
            return Err(self.vetoed(module.as_ref(), Operation::Run));
        }

        {
            let mut inner = self.lock();
            if inner.running.is_some() {
                warn!(machine = %self.label(), "Run requested but machine is already running");
                return Err(MachineError::AlreadyRunning);
            }
            inner.running = Some(CancellationToken::new());
        }

        info!(machine = %self.label(), modules = modules.len(), "Machine running");
        for module in &modules {
            module.on_machine_ran();
        }
        Ok(())
    }

    /// Stop the machine, cancelling any in-flight transition.
    ///
    /// Returns without waiting for the cancelled transition to settle.
    pub fn stop(&self) -> Result<(), MachineError> {
        let modules = {
            let inner = self.lock();
            if inner.running.is_none() {
                warn!(machine = %self.label(), "Stop requested but machine is not running");
                return Err(MachineError::NotRunning);
            }
            inner.modules.handles()
        };

        if let Some(module) = modules.iter().find(|m| !m.allow_stop_machine()) {
            return Err(self.vetoed(module.as_ref(), Operation::Stop));
        }

        {
            let mut inner = self.lock();
            let Some(running) = inner.running.take() else {
                warn!(machine = %self.label(), "Stop requested but machine is not running");
                return Err(MachineError::NotRunning);
            };
            running.cancel();
        }

        info!(machine = %self.label(), "Machine stopped");
        for module in &modules {
            module.on_machine_stopped();
        }
        Ok(())
    }

    /// Ask the machine to move to `state`.
    ///
    /// The request begins immediately, before the returned future is
    /// polled: modules are polled for vetoes, any in-flight transition is
    /// cancelled and the transition is spawned on the current tokio runtime.
    /// The spawned transition waits for the superseded one to settle, runs
    /// the sequence in a scope linked to the running scope and `cancel`, and
    /// commits the result. The last call to begin always wins.
    ///
    /// Resolves to the new current state, or [`MachineError::Cancelled`] if
    /// the transition was superseded, the machine stopped, or `cancel` fired
    /// before it committed. Dropping the future detaches from the
    /// transition without cancelling it; cancel through `cancel` instead.
    pub fn change_state(
        &self,
        state: S,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<S, MachineError>> + Send + 'static {
        let launched = self.launch(state, cancel);
        async move {
            let task = match launched {
                Ok(task) => task,
                Err(error) => return Err(error),
            };
            match task.await {
                Ok(outcome) => outcome,
                Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
                Err(_) => Err(MachineError::Cancelled),
            }
        }
    }

    /// Fire-and-forget [`change_state`](Self::change_state). Failures are
    /// logged, never returned.
    pub fn request_state(&self, state: S) {
        // Dropping the handle detaches the transition.
        let _ = self.launch(state, CancellationToken::new());
    }

    fn launch(
        &self,
        requested: S,
        caller: CancellationToken,
    ) -> Result<JoinHandle<Result<S, MachineError>>, MachineError> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                machine = %self.label(),
                to = requested.name(),
                "No tokio runtime to drive the state change"
            );
            return Err(MachineError::NoRuntime);
        };
        let pending = self.begin(requested, caller)?;
        Ok(runtime.spawn(pending.complete()))
    }

    fn begin(
        &self,
        requested: S,
        caller: CancellationToken,
    ) -> Result<PendingTransition<S>, MachineError> {
        let modules = {
            let inner = self.lock();
            if inner.running.is_none() {
                warn!(
                    machine = %self.label(),
                    to = requested.name(),
                    "State change requested while machine is not running"
                );
                return Err(MachineError::NotRunning);
            }
            inner.modules.handles()
        };

        if let Some(module) = modules.iter().find(|m| !m.allow_change_state(&requested)) {
            warn!(
                machine = %self.label(),
                module = module.name(),
                to = requested.name(),
                "Module vetoed state change"
            );
            return Err(MachineError::Vetoed {
                module: module.name().to_string(),
                operation: Operation::ChangeState,
            });
        }

        let (settled_tx, settled_rx) = watch::channel(());
        let (ticket, scope, predecessor) = {
            let mut inner = self.lock();
            let Some(running) = inner.running.as_ref() else {
                warn!(
                    machine = %self.label(),
                    to = requested.name(),
                    "State change requested while machine is not running"
                );
                return Err(MachineError::NotRunning);
            };
            let scope = TransitionScope::link(running, caller);
            inner.tickets += 1;
            let ticket = inner.tickets;
            let superseded = inner.in_flight.replace(InFlight {
                ticket,
                scope: scope.token().clone(),
                settled: settled_rx,
            });
            let predecessor = superseded.map(|previous| {
                previous.scope.cancel();
                (previous.ticket, previous.settled)
            });
            (ticket, scope, predecessor)
        };

        if let Some((superseded, _)) = &predecessor {
            debug!(
                machine = %self.label(),
                ticket,
                superseded,
                to = requested.name(),
                "Superseding in-flight transition"
            );
        }

        Ok(PendingTransition {
            settle: Settle {
                machine: self.clone(),
                ticket,
                _settled: settled_tx,
            },
            requested,
            scope,
            predecessor: predecessor.map(|(_, settled)| settled),
        })
    }

    fn vetoed(&self, module: &dyn Module<S>, operation: Operation) -> MachineError {
        warn!(
            machine = %self.label(),
            module = module.name(),
            %operation,
            "Module vetoed operation"
        );
        MachineError::Vetoed {
            module: module.name().to_string(),
            operation,
        }
    }

    /// Attach `module`, keyed by its concrete type.
    ///
    /// The machine must be stopped and no module of type `M` may be
    /// attached yet. If the module reports a linkage violation from
    /// [`Module::on_linked`] it is detached again and the violation
    /// returned.
    pub fn add_module<M: Module<S>>(&self, module: Arc<M>) -> Result<(), MachineError> {
        let type_id = TypeId::of::<M>();
        self.check_attach(&self.lock(), type_id, module.name())?;

        if !module.allow_link_to(self) {
            warn!(
                machine = %self.label(),
                module = module.name(),
                "Module refused to link"
            );
            return Err(MachineError::LinkRefused {
                module: module.name().to_string(),
            });
        }

        {
            let mut inner = self.lock();
            self.check_attach(&inner, type_id, module.name())?;
            inner.modules.insert(ModuleEntry::new(Arc::clone(&module)));
        }

        if let Err(violation) = module.on_linked(self) {
            error!(
                machine = %self.label(),
                module = module.name(),
                %violation,
                "Module linkage violated, detaching"
            );
            self.lock().modules.remove(type_id);
            module.on_unlinked(self);
            return Err(MachineError::Linkage(violation));
        }

        debug!(machine = %self.label(), module = module.name(), "Module attached");
        Ok(())
    }

    fn check_attach(
        &self,
        inner: &Inner<S>,
        type_id: TypeId,
        name: &str,
    ) -> Result<(), MachineError> {
        if inner.running.is_some() {
            warn!(machine = %self.label(), module = name, "Cannot add module while running");
            return Err(MachineError::Running {
                operation: Operation::AddModule,
            });
        }
        if inner.modules.contains(type_id) {
            warn!(machine = %self.label(), module = name, "Module type already attached");
            return Err(MachineError::DuplicateModule {
                module: name.to_string(),
            });
        }
        Ok(())
    }

    /// Detach the module of type `M` and hand it back.
    pub fn remove_module<M: Module<S>>(&self) -> Result<Arc<M>, MachineError> {
        let type_name = std::any::type_name::<M>();
        let entry = {
            let mut inner = self.lock();
            if inner.running.is_some() {
                warn!(machine = %self.label(), module = type_name, "Cannot remove module while running");
                return Err(MachineError::Running {
                    operation: Operation::RemoveModule,
                });
            }
            inner.modules.remove(TypeId::of::<M>())
        };

        let Some(module) = entry.as_ref().and_then(ModuleEntry::downcast::<M>) else {
            warn!(machine = %self.label(), module = type_name, "No module of this type attached");
            return Err(MachineError::MissingModule {
                module: type_name.to_string(),
            });
        };
        drop(entry);

        module.on_unlinked(self);
        debug!(machine = %self.label(), module = module.name(), "Module detached");
        Ok(module)
    }

    pub fn has_module<M: Module<S>>(&self) -> bool {
        self.lock().modules.contains(TypeId::of::<M>())
    }

    pub fn get_module<M: Module<S>>(&self) -> Option<Arc<M>> {
        self.lock().modules.get::<M>()
    }

    /// Names of attached modules in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.lock().modules.names()
    }

    /// Detach every module, newest first.
    pub(crate) fn detach_all(&self) {
        let entries = self.lock().modules.drain();
        for entry in entries.into_iter().rev() {
            let module = entry.module();
            module.on_unlinked(self);
            debug!(machine = %self.label(), module = module.name(), "Module detached");
        }
    }
}

impl<S: State> Clone for StateMachine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("StateMachine")
            .field("label", &self.shared.label)
            .field("current", &inner.current)
            .field("running", &inner.running.is_some())
            .field("modules", &inner.modules.len())
            .field("in_transition", &inner.in_flight.is_some())
            .finish()
    }
}

impl<S: State> WeakMachine<S> {
    pub fn upgrade(&self) -> Option<StateMachine<S>> {
        self.shared.upgrade().map(|shared| StateMachine { shared })
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    pub fn points_to(&self, machine: &StateMachine<S>) -> bool {
        std::ptr::eq(self.shared.as_ptr(), Arc::as_ptr(&machine.shared))
    }
}

impl<S: State> Clone for WeakMachine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<S: State> fmt::Debug for WeakMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMachine")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Clears the in-flight marker (if still ours) and releases the successor
/// when dropped, however the transition ended.
struct Settle<S: State> {
    machine: StateMachine<S>,
    ticket: u64,
    _settled: watch::Sender<()>,
}

impl<S: State> Drop for Settle<S> {
    fn drop(&mut self) {
        let mut inner = self.machine.lock();
        if inner
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.ticket == self.ticket)
        {
            inner.in_flight = None;
        }
    }
}

/// A begun request waiting to be driven.
struct PendingTransition<S: State> {
    settle: Settle<S>,
    requested: S,
    scope: TransitionScope,
    predecessor: Option<watch::Receiver<()>>,
}

impl<S: State> PendingTransition<S> {
    async fn complete(self) -> Result<S, MachineError> {
        let PendingTransition {
            settle,
            requested,
            scope,
            predecessor,
        } = self;
        let machine = &settle.machine;
        let ticket = settle.ticket;

        if let Some(mut settled) = predecessor {
            scope
                .guard(async move { while settled.changed().await.is_ok() {} })
                .await;
        }

        if scope.is_cancelled() {
            debug!(
                machine = %machine.label(),
                ticket,
                to = requested.name(),
                "Transition cancelled before it started"
            );
            return Err(MachineError::Cancelled);
        }

        let current = machine.current_state();
        let target = requested.name().to_string();
        debug!(
            machine = %machine.label(),
            ticket,
            from = current.name(),
            to = %target,
            "Transition started"
        );

        let outcome = scope
            .guard(
                machine
                    .shared
                    .sequence
                    .run(current, requested, scope.token().clone()),
            )
            .await;

        let next = match outcome {
            Ok(next) => next,
            Err(SequenceError::Cancelled) => {
                debug!(machine = %machine.label(), ticket, to = %target, "Transition cancelled");
                return Err(MachineError::Cancelled);
            }
            Err(error) => {
                warn!(
                    machine = %machine.label(),
                    ticket,
                    to = %target,
                    %error,
                    "Transition sequence failed"
                );
                return Err(MachineError::Sequence(error));
            }
        };

        let committed = {
            let mut inner = machine.lock();
            if scope.is_cancelled() {
                None
            } else {
                let from = std::mem::replace(&mut inner.current, next.clone());
                Some((from, inner.modules.handles()))
            }
        };

        let Some((from, modules)) = committed else {
            debug!(
                machine = %machine.label(),
                ticket,
                to = next.name(),
                "Discarding result of cancelled transition"
            );
            return Err(MachineError::Cancelled);
        };

        info!(
            machine = %machine.label(),
            ticket,
            from = from.name(),
            to = next.name(),
            "State changed"
        );
        for module in &modules {
            module.on_state_changed(&next);
        }
        // No subscribers is fine.
        let _ = machine.shared.events.send(StateChange {
            from,
            to: next.clone(),
            timestamp: Utc::now(),
            ticket,
        });

        Ok(next)
    }
}
