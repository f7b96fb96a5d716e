//! States, steps and finite state machines.
//!
//! - [`State`]: anything a machine can enter, tick and exit
//! - [`Step`]: a state that completes itself, with exactly-once completion
//! - [`FiniteStateMachine`]: a registry of states plus a [`Flow`]; it is a
//!   state too, so machines nest
//!
//! Completion is signalled with a [`CompletionSignal`] handed to the state on
//! every `enter`. The machine watches the signal of its current state and
//! routes completions to its flow within the same `enter`/`update` call.

pub mod error;
mod flow;
mod fsm;
mod history;
mod state;

pub use error::StateError;
pub use flow::Sequence;
pub use fsm::{FiniteStateMachine, Flow, Machine, StateHandle};
pub use history::{TransitionHistory, TransitionRecord, DEFAULT_HISTORY_LIMIT};
pub use state::{CompletionSignal, State, StateCore, Step, StepCore};
