//! Serialized action pipeline: the single coordinator of each state machine.
//!
//! Every component runs as one pipeline task. All actions — commands from
//! callers, notifications from transport forwarders, timer resolutions —
//! funnel through one unbounded channel and are processed strictly in
//! order: the middleware handles the action (performing side effects and
//! dispatching follow-ups), then the pure reducer folds it into state. The
//! new state is published on a watch channel and the action is mirrored to
//! a broadcast tap for observers.
//!
//! **Architecture rule**: reducers never block and never perform side
//! effects; middleware owns every subscription, invitation, and send.

use crate::cancel::StopSignal;
use crate::config::ACTION_TAP_CAPACITY;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::trace;

/// A side-effecting state-machine component driven by the pipeline.
///
/// `handle` observes each action before reduction. It may mutate its own
/// fields (subscription handles, invitation tracking) and dispatch zero or
/// more follow-up actions through `out`, synchronously or from spawned
/// tasks holding a clone of `out`.
pub trait Middleware: Send + 'static {
    type Action: Clone + Send + 'static;
    type State: Clone + Send + Sync + 'static;

    fn handle(&mut self, action: &Self::Action, state: &Self::State, out: &ActionSender<Self::Action>);
}

/// Pure fold of one action into component state.
pub type Reducer<S, A> = fn(&mut S, &A);

/// Cloneable dispatch handle into a pipeline.
///
/// Dispatching into a shut-down pipeline is a silent no-op: late
/// resolutions from cancelled subscriptions have nowhere to go and nothing
/// to break.
pub struct ActionSender<A> {
    tx: mpsc::UnboundedSender<A>,
}

impl<A> ActionSender<A> {
    pub fn dispatch(&self, action: A) {
        if self.tx.send(action).is_err() {
            trace!(event = "dispatch_after_shutdown", "Action dropped, pipeline gone");
        }
    }
}

impl<A> Clone for ActionSender<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Handle to a running pipeline: dispatch commands, observe state and
/// actions. Dropping the handle tears the pipeline task down.
pub struct Pipeline<M: Middleware> {
    actions: ActionSender<M::Action>,
    state: watch::Receiver<M::State>,
    tap: broadcast::Sender<M::Action>,
    task: JoinHandle<()>,
}

impl<M: Middleware> Pipeline<M> {
    /// Spawn the pipeline task for one middleware instance.
    pub fn spawn(middleware: M, initial: M::State, reducer: Reducer<M::State, M::Action>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<M::Action>();
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (tap_tx, _) = broadcast::channel(ACTION_TAP_CAPACITY);

        let out = ActionSender { tx: tx.clone() };
        let tap = tap_tx.clone();
        let task = tokio::spawn(async move {
            let mut middleware = middleware;
            let mut state = initial;
            while let Some(action) = rx.recv().await {
                middleware.handle(&action, &state, &out);
                reducer(&mut state, &action);
                let _ = state_tx.send(state.clone());
                let _ = tap_tx.send(action);
            }
        });

        Self {
            actions: ActionSender { tx },
            state: state_rx,
            tap,
            task,
        }
    }

    /// Dispatch an action into the pipeline.
    pub fn dispatch(&self, action: M::Action) {
        self.actions.dispatch(action);
    }

    /// A cloneable dispatch handle, for wiring pipelines together.
    pub fn sender(&self) -> ActionSender<M::Action> {
        self.actions.clone()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> M::State {
        self.state.borrow().clone()
    }

    /// Watch channel following every state change.
    pub fn watch_state(&self) -> watch::Receiver<M::State> {
        self.state.clone()
    }

    /// Subscribe to every action the pipeline processes, post-reduction.
    pub fn observe(&self) -> broadcast::Receiver<M::Action> {
        self.tap.subscribe()
    }
}

impl<M: Middleware> Drop for Pipeline<M> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ── Subscriptions ────────────────────────────────────────────────────────────

/// Ownership guard for one live transport subscription or in-flight
/// invitation: a forwarder task plus its stop signal.
///
/// Replacing the guard (or dropping it) cancels the forwarder, so a state
/// machine can never leak a second subscription for the same activity.
#[derive(Debug)]
pub struct Subscription {
    stop: StopSignal,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(stop: StopSignal, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.stop();
        self.task.abort();
    }
}
