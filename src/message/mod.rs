//! Deferred publish/subscribe messaging.
//!
//! Messages are routed by their Rust type. A [`MessageDispatcher`] either
//! delivers a message immediately ([`publish`](MessageDispatcher::publish)) or
//! queues it for the next drain ([`update`](MessageDispatcher::update)), which
//! delivers exactly the messages that were queued when the drain started.

mod dispatcher;
pub mod error;
mod kind;

pub use dispatcher::{handler, Handler, MessageDispatcher};
pub use error::{DispatchError, HandlerError, HandlerResult, StackSnapshot};
pub use kind::{Message, MessageKind, MessageWithCallback, ResponseCallback};
