//! Finite state machine that is itself a state.

use crate::context::StateContext;
use crate::machine::error::StateError;
use crate::machine::history::{TransitionHistory, TransitionRecord};
use crate::machine::state::{CompletionSignal, State, StepCore};
use crate::message::MessageDispatcher;
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

/// Reference to a state registered in one particular machine.
///
/// Handles from another machine are rejected by
/// [`Machine::change_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHandle {
    machine: Uuid,
    slot: usize,
}

struct Active {
    handle: StateHandle,
    signal: CompletionSignal,
    reported: bool,
}

/// Registry, current state and completion bookkeeping of a machine.
///
/// This is the part a [`Flow`] drives; [`FiniteStateMachine`] pairs it with
/// the flow and implements [`State`].
pub struct Machine {
    uuid: Uuid,
    core: StepCore,
    states: Vec<Box<dyn State>>,
    index: HashMap<String, usize>,
    current: Option<Active>,
    history: TransitionHistory,
}

impl Machine {
    pub fn new(id: impl Into<String>, context: &StateContext) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            core: StepCore::new(id, context),
            states: Vec::new(),
            index: HashMap::new(),
            current: None,
            history: TransitionHistory::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.core.id()
    }

    pub fn context(&self) -> &StateContext {
        self.core.context()
    }

    /// Add a state to the registry. Meant to be called while building the
    /// machine.
    pub fn register_state<S>(&mut self, state: S) -> Result<StateHandle, StateError>
    where
        S: State + 'static,
    {
        if self.index.contains_key(state.id()) {
            return Err(StateError::DuplicateStateId {
                machine: self.id().to_string(),
                id: state.id().to_string(),
            });
        }

        let slot = self.states.len();
        self.index.insert(state.id().to_string(), slot);
        self.states.push(Box::new(state));

        Ok(StateHandle {
            machine: self.uuid,
            slot,
        })
    }

    /// Exit the current state, make `target` current, then enter it.
    ///
    /// `None` leaves the machine idle. The new state receives a fresh
    /// completion signal that the machine watches.
    pub fn change_state(&mut self, target: Option<StateHandle>) -> Result<(), StateError> {
        if let Some(handle) = target {
            if handle.machine != self.uuid || handle.slot >= self.states.len() {
                return Err(StateError::InvalidStateTransition {
                    machine: self.id().to_string(),
                    handle,
                });
            }
        }

        let from = self.current_state_id().map(str::to_string);
        if let Some(active) = &self.current {
            self.states[active.handle.slot].exit();
        }

        self.current = target.map(|handle| Active {
            handle,
            signal: CompletionSignal::new(),
            reported: false,
        });
        let to = self.current_state_id().map(str::to_string);
        self.history.record(TransitionRecord {
            from,
            to,
            timestamp: Utc::now(),
        });

        if let Some(active) = &self.current {
            let signal = active.signal.clone();
            self.states[active.handle.slot].enter(Some(signal))?;
        }
        Ok(())
    }

    /// Look up `id` and change to it. An empty id changes to no state.
    pub fn change_state_by_id(&mut self, id: &str) -> Result<(), StateError> {
        let target = self.get_state_by_id(id)?;
        self.change_state(target)
    }

    /// Handle of the state registered as `id`.
    ///
    /// Returns `Ok(None)` for an empty id and
    /// [`StateError::UnknownStateId`] for any other id that isn't registered.
    pub fn get_state_by_id(&self, id: &str) -> Result<Option<StateHandle>, StateError> {
        if id.is_empty() {
            return Ok(None);
        }

        match self.index.get(id) {
            Some(&slot) => Ok(Some(StateHandle {
                machine: self.uuid,
                slot,
            })),
            None => Err(StateError::UnknownStateId {
                machine: self.id().to_string(),
                id: id.to_string(),
            }),
        }
    }

    pub fn state(&self, handle: StateHandle) -> Option<&dyn State> {
        if handle.machine != self.uuid {
            return None;
        }
        self.states.get(handle.slot).map(|state| state.as_ref())
    }

    pub fn state_id(&self, handle: StateHandle) -> Option<&str> {
        self.state(handle).map(|state| state.id())
    }

    pub fn current_handle(&self) -> Option<StateHandle> {
        self.current.as_ref().map(|active| active.handle)
    }

    pub fn current_state(&self) -> Option<&dyn State> {
        self.current
            .as_ref()
            .map(|active| self.states[active.handle.slot].as_ref())
    }

    pub fn current_state_id(&self) -> Option<&str> {
        self.current_state().map(|state| state.id())
    }

    /// Finish the machine: leave the current state, fire the machine's own
    /// completion signal, then exit the machine itself.
    pub fn complete(&mut self) -> Result<(), StateError> {
        self.change_state(None)?;
        self.core.complete();
        self.core.end();
        Ok(())
    }

    pub fn was_complete_called(&self) -> bool {
        self.core.was_complete_called()
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Keep at most `limit` transitions in the history.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn update_current(&mut self, delta_time: f32) -> Result<(), StateError> {
        if let Some(active) = &self.current {
            self.states[active.handle.slot].update(delta_time)?;
        }
        Ok(())
    }

    /// The current state, if it completed and hasn't been reported yet.
    fn take_completed(&mut self) -> Option<StateHandle> {
        let active = self.current.as_mut()?;
        if active.reported || !active.signal.is_fired() {
            return None;
        }
        active.reported = true;
        Some(active.handle)
    }
}

/// Transition logic of a machine.
///
/// The flow decides where to go when the machine is entered and whenever the
/// active state completes.
pub trait Flow {
    /// Called after the machine itself has been entered.
    fn on_enter(&mut self, machine: &mut Machine) -> Result<(), StateError>;

    /// Called when the state behind `completed` has signalled completion.
    ///
    /// To finish the whole machine, call [`Machine::complete`].
    fn on_state_complete(
        &mut self,
        completed: StateHandle,
        machine: &mut Machine,
    ) -> Result<(), StateError>;

    /// Subscribe (`true`, when the machine is entered) or unsubscribe
    /// (`false`, when it is exited) every message handler the flow owns.
    fn subscribe_to_messages(
        &mut self,
        _dispatcher: &MessageDispatcher,
        _should_subscribe: bool,
    ) {
    }
}

/// A machine made of registered states and a [`Flow`] that moves between
/// them.
///
/// Because it implements [`State`], a machine can be registered inside
/// another machine; its completion signal then fires when its flow calls
/// [`Machine::complete`].
pub struct FiniteStateMachine<F> {
    machine: Machine,
    flow: F,
}

impl<F: Flow> FiniteStateMachine<F> {
    pub fn new(id: impl Into<String>, context: &StateContext, flow: F) -> Self {
        Self {
            machine: Machine::new(id, context),
            flow,
        }
    }

    pub fn register_state<S>(&mut self, state: S) -> Result<StateHandle, StateError>
    where
        S: State + 'static,
    {
        self.machine.register_state(state)
    }

    /// See [`Machine::change_state`]. Completions triggered by the change are
    /// routed to the flow before this returns.
    pub fn change_state(&mut self, target: Option<StateHandle>) -> Result<(), StateError> {
        self.machine.change_state(target)?;
        self.settle()
    }

    pub fn change_state_by_id(&mut self, id: &str) -> Result<(), StateError> {
        self.machine.change_state_by_id(id)?;
        self.settle()
    }

    pub fn get_state_by_id(&self, id: &str) -> Result<Option<StateHandle>, StateError> {
        self.machine.get_state_by_id(id)
    }

    pub fn current_state(&self) -> Option<&dyn State> {
        self.machine.current_state()
    }

    pub fn current_state_id(&self) -> Option<&str> {
        self.machine.current_state_id()
    }

    pub fn complete(&mut self) -> Result<(), StateError> {
        self.machine.complete()
    }

    pub fn history(&self) -> &TransitionHistory {
        self.machine.history()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    fn settle(&mut self) -> Result<(), StateError> {
        while let Some(completed) = self.machine.take_completed() {
            self.flow.on_state_complete(completed, &mut self.machine)?;
        }
        Ok(())
    }
}

impl<F: Flow> State for FiniteStateMachine<F> {
    fn id(&self) -> &str {
        self.machine.id()
    }

    fn enter(&mut self, on_complete: Option<CompletionSignal>) -> Result<(), StateError> {
        self.machine.core.begin(on_complete);
        self.flow.subscribe_to_messages(self.machine.core.dispatcher(), true);
        self.flow.on_enter(&mut self.machine)?;
        self.settle()
    }

    fn update(&mut self, delta_time: f32) -> Result<(), StateError> {
        self.machine.update_current(delta_time)?;
        self.settle()
    }

    fn exit(&mut self) {
        self.machine.core.end();
        self.flow.subscribe_to_messages(self.machine.core.dispatcher(), false);
    }

    fn was_complete_called(&self) -> bool {
        self.machine.was_complete_called()
    }
}
