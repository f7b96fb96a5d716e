//! Message trait and the compile-time dispatch key.

use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Marker trait for anything that can travel through a
/// [`MessageDispatcher`](super::MessageDispatcher).
///
/// The concrete Rust type is the dispatch key, so a message type only has to
/// opt in:
///
/// ```rust
/// use stepwise::message::Message;
///
/// struct PlaySoundEffect {
///     sound_effect_id: String,
/// }
///
/// impl Message for PlaySoundEffect {}
/// ```
pub trait Message: Any {}

/// Dispatch key of a message, resolved from its type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKind {
    id: TypeId,
    name: &'static str,
}

impl MessageKind {
    /// Kind of the message type `M`.
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
        }
    }

    /// Fully qualified type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One-shot callback carried by a [`MessageWithCallback`].
pub type ResponseCallback<M> = Box<dyn FnOnce(&M)>;

/// A message whose handler must report back once it is done.
///
/// The handler fills in any response fields on the message and then calls
/// [`complete`](MessageWithCallback::complete), which hands the message to the
/// stored callback.
///
/// ```rust
/// use stepwise::message::{Message, MessageWithCallback, ResponseCallback};
///
/// struct RollToHit {
///     is_hit: bool,
///     on_complete: Option<ResponseCallback<RollToHit>>,
/// }
///
/// impl Message for RollToHit {}
///
/// impl MessageWithCallback for RollToHit {
///     fn take_callback(&mut self) -> Option<ResponseCallback<Self>> {
///         self.on_complete.take()
///     }
/// }
/// ```
pub trait MessageWithCallback: Message + Sized {
    /// Remove the callback from the message. Returns `None` once taken.
    fn take_callback(&mut self) -> Option<ResponseCallback<Self>>;

    /// Invoke the callback with this message. Later calls do nothing.
    fn complete(&mut self) {
        if let Some(callback) = self.take_callback() {
            callback(&*self);
        }
    }
}
