//! Steps that send a message when entered.

use crate::context::StateContext;
use crate::machine::{StateError, Step, StepCore};
use crate::message::{Message, MessageWithCallback, ResponseCallback};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Builds the message a [`SendMessageStep`] sends.
///
/// Any `FnMut() -> M` closure is a `CreateMessage`.
pub trait CreateMessage {
    type Message: Message;

    fn create_message(&mut self) -> Self::Message;
}

impl<M, F> CreateMessage for F
where
    M: Message,
    F: FnMut() -> M,
{
    type Message = M;

    fn create_message(&mut self) -> M {
        self()
    }
}

/// Fire-and-forget step: enqueues one message on enter and completes on the
/// next update.
///
/// ```rust
/// use stepwise::machine::State;
/// use stepwise::message::Message;
/// use stepwise::steps::SendMessageStep;
/// use stepwise::StateContext;
///
/// struct PlaySoundEffect(&'static str);
/// impl Message for PlaySoundEffect {}
///
/// let context = StateContext::default();
/// let mut step = SendMessageStep::new("Fanfare", &context, || PlaySoundEffect("fanfare"));
///
/// step.enter(None).unwrap();
/// assert_eq!(context.dispatcher().pending_messages(), 1);
/// step.update(0.0).unwrap();
/// assert!(step.was_complete_called());
/// ```
pub struct SendMessageStep<C> {
    core: StepCore,
    creator: C,
}

impl<C: CreateMessage> SendMessageStep<C> {
    pub fn new(id: impl Into<String>, context: &StateContext, creator: C) -> Self {
        Self {
            core: StepCore::new(id, context),
            creator,
        }
    }

    pub fn creator(&self) -> &C {
        &self.creator
    }
}

impl<C: CreateMessage> Step for SendMessageStep<C> {
    fn core(&self) -> &StepCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore {
        &mut self.core
    }

    fn should_auto_complete(&self) -> bool {
        true
    }

    fn on_enter(&mut self) -> Result<(), StateError> {
        let message = self.creator.create_message();
        self.core.dispatcher().enqueue(message);
        Ok(())
    }
}

/// Builds the message a [`SendMessageWithResponseStep`] sends and reads the
/// response back out of it.
pub trait CreateMessageWithResponse {
    type Message: MessageWithCallback;
    type Response: Clone + 'static;

    /// Build the message. `on_response` must end up as the message's
    /// callback.
    fn create_message(&mut self, on_response: ResponseCallback<Self::Message>) -> Self::Message;

    /// Extract the response from the handled message.
    fn read_response(message: &Self::Message) -> Self::Response;
}

/// Request/response step: enqueues a message carrying a callback on enter and
/// completes on the first update after a handler invoked the callback.
///
/// Each enter uses a fresh completion flag, so a response to a message sent
/// in an earlier cycle cannot complete the current one.
pub struct SendMessageWithResponseStep<C: CreateMessageWithResponse> {
    core: StepCore,
    creator: C,
    work_completed: Rc<Cell<bool>>,
    response: Rc<RefCell<Option<C::Response>>>,
}

impl<C: CreateMessageWithResponse> SendMessageWithResponseStep<C> {
    pub fn new(id: impl Into<String>, context: &StateContext, creator: C) -> Self {
        Self {
            core: StepCore::new(id, context),
            creator,
            work_completed: Rc::new(Cell::new(false)),
            response: Rc::new(RefCell::new(None)),
        }
    }

    pub fn creator(&self) -> &C {
        &self.creator
    }

    /// Whether the response for the current cycle has arrived.
    pub fn is_work_completed(&self) -> bool {
        self.work_completed.get()
    }

    /// The response received in the current cycle.
    pub fn response(&self) -> Option<C::Response> {
        self.response.borrow().clone()
    }
}

impl<C: CreateMessageWithResponse> Step for SendMessageWithResponseStep<C> {
    fn core(&self) -> &StepCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore {
        &mut self.core
    }

    fn should_auto_complete(&self) -> bool {
        self.work_completed.get()
    }

    fn on_enter(&mut self) -> Result<(), StateError> {
        self.work_completed = Rc::new(Cell::new(false));
        self.response = Rc::new(RefCell::new(None));

        let work_completed = Rc::clone(&self.work_completed);
        let response = Rc::clone(&self.response);
        let on_response: ResponseCallback<C::Message> = Box::new(move |message: &C::Message| {
            *response.borrow_mut() = Some(C::read_response(message));
            work_completed.set(true);
        });

        let message = self.creator.create_message(on_response);
        self.core.dispatcher().enqueue(message);
        Ok(())
    }
}
