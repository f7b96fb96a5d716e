//! Stepwise: tick-driven state machines and deferred messaging for
//! turn-based game flow.
//!
//! A turn is modelled as a [`FiniteStateMachine`] whose states are small
//! self-completing steps. Steps talk to the rest of the game through a shared
//! [`MessageDispatcher`]: they enqueue messages, handlers pick them up on the
//! next drain, and responses come back through callbacks carried inside the
//! messages.
//!
//! # Core Concepts
//!
//! - **State**: anything that can be entered, ticked and exited ([`State`])
//! - **Step**: a state with exactly-once completion ([`Step`])
//! - **Flow**: the transition logic of a machine ([`Flow`], [`Sequence`])
//! - **Dispatcher**: type-routed deferred publish/subscribe
//! - **Driver**: updates the root state, then drains the dispatcher, every tick
//!
//! # Example
//!
//! ```rust
//! use stepwise::machine::{CompletionSignal, FiniteStateMachine, Sequence};
//! use stepwise::steps::TimedStep;
//! use stepwise::{Driver, StateContext};
//! use std::rc::Rc;
//!
//! let context = StateContext::default();
//! let mut turn = FiniteStateMachine::new("Turn", &context, Sequence::new(["Roll", "Resolve"]));
//! turn.register_state(TimedStep::new("Roll", &context, 1.0)).unwrap();
//! turn.register_state(TimedStep::new("Resolve", &context, 0.5)).unwrap();
//!
//! let done = CompletionSignal::new();
//! let mut driver = Driver::new(turn, Rc::clone(context.dispatcher()));
//! driver.start(Some(done.clone())).unwrap();
//!
//! driver.tick(1.0).unwrap();
//! assert_eq!(driver.root().current_state_id(), Some("Resolve"));
//!
//! driver.tick(0.5).unwrap();
//! assert!(done.is_fired());
//! ```

pub mod context;
pub mod driver;
pub mod machine;
pub mod message;
pub mod steps;

// Re-export commonly used types
pub use context::{Diagnostics, StateContext};
pub use driver::{Driver, TickError};
pub use machine::{CompletionSignal, FiniteStateMachine, Flow, Sequence, State, StateError, Step};
pub use message::{handler, DispatchError, Message, MessageDispatcher, MessageWithCallback};
