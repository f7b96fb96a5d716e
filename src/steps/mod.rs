//! Reusable steps.

mod send_message;
mod timed;

pub use send_message::{
    CreateMessage, CreateMessageWithResponse, SendMessageStep, SendMessageWithResponseStep,
};
pub use timed::TimedStep;
