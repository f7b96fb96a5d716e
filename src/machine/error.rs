//! State machine errors.

use crate::machine::fsm::StateHandle;
use thiserror::Error;

/// Errors raised while registering or changing states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("A state with the id '{id}' is already registered in machine '{machine}'")]
    DuplicateStateId { machine: String, id: String },

    #[error("State {handle:?} does not exist inside machine '{machine}'")]
    InvalidStateTransition {
        machine: String,
        handle: StateHandle,
    },

    #[error("The state id '{id}' does not exist inside machine '{machine}'")]
    UnknownStateId { machine: String, id: String },
}
