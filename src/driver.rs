//! Per-tick driver for a root state and its dispatcher.

use crate::machine::{CompletionSignal, State, StateError};
use crate::message::{DispatchError, MessageDispatcher};
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

/// Errors from a single [`Driver::tick`].
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Owns the root state and ticks it together with the dispatcher.
///
/// Every tick updates the root state first and drains the dispatcher second.
/// A message a state enqueues during a tick is therefore delivered in the same
/// tick, and a response delivered by that drain is seen by the states on the
/// next tick.
pub struct Driver<S> {
    root: S,
    dispatcher: Rc<MessageDispatcher>,
}

impl<S: State> Driver<S> {
    pub fn new(root: S, dispatcher: Rc<MessageDispatcher>) -> Self {
        Self { root, dispatcher }
    }

    /// Enter the root state.
    pub fn start(&mut self, on_complete: Option<CompletionSignal>) -> Result<(), StateError> {
        self.root.enter(on_complete)
    }

    /// Run one tick: root update, then one dispatcher drain.
    ///
    /// The drain runs even when the update fails. The update's error wins;
    /// a drain failure in the same tick is logged and dropped.
    pub fn tick(&mut self, delta_time: f32) -> Result<(), TickError> {
        let updated = self.root.update(delta_time);
        let drained = self.dispatcher.update();

        match (updated, drained) {
            (Err(state), Err(dispatch)) => {
                warn!(error = %dispatch, "drain failed in a tick whose update already failed");
                Err(state.into())
            }
            (Err(state), Ok(())) => Err(state.into()),
            (Ok(()), drained) => Ok(drained?),
        }
    }

    pub fn root(&self) -> &S {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut S {
        &mut self.root
    }

    pub fn dispatcher(&self) -> &Rc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn into_root(self) -> S {
        self.root
    }
}
