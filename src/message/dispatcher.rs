//! Deferred publish/subscribe dispatcher.

use crate::message::error::{DispatchError, HandlerResult, StackSnapshot};
use crate::message::kind::{Message, MessageKind};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, warn};

/// Subscriber callback for messages of type `M`.
///
/// The `Rc` allocation is the handler's identity: unsubscribing needs a clone
/// of the same `Rc` that was subscribed.
pub type Handler<M> = Rc<dyn Fn(&mut M) -> HandlerResult>;

/// Wrap a closure as a [`Handler`].
///
/// ```rust
/// use stepwise::message::{handler, Message};
///
/// struct Ping;
/// impl Message for Ping {}
///
/// let on_ping = handler(|_: &mut Ping| Ok(()));
/// ```
pub fn handler<M, F>(f: F) -> Handler<M>
where
    M: Message,
    F: Fn(&mut M) -> HandlerResult + 'static,
{
    Rc::new(f)
}

type ErasedHandler = Rc<dyn Fn(&mut dyn Any) -> HandlerResult>;

fn erase<M: Message>(typed: Handler<M>) -> ErasedHandler {
    Rc::new(move |message: &mut dyn Any| match message.downcast_mut::<M>() {
        Some(message) => typed(message),
        None => Ok(()),
    })
}

struct Subscription {
    key: *const (),
    invoke: ErasedHandler,
}

struct QueuedMessage {
    kind: MessageKind,
    message: Box<dyn Any>,
    queued_stack: Option<StackSnapshot>,
}

/// Routes messages to subscribers, either immediately or on the next drain.
///
/// All methods take `&self`; handlers may subscribe, enqueue or publish while
/// they are being dispatched. Share it between states with `Rc`.
#[derive(Default)]
pub struct MessageDispatcher {
    record_stack_trace: Cell<bool>,
    subscriptions: RefCell<HashMap<MessageKind, Vec<Subscription>>>,
    queue: RefCell<VecDeque<QueuedMessage>>,
}

impl MessageDispatcher {
    /// Create a dispatcher with stack capture turned off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn enqueue-time stack capture on or off.
    ///
    /// Capturing a stack on every enqueue is expensive; leave it off unless a
    /// failing handler needs to be traced back to its sender.
    pub fn set_record_stack_trace(&self, enabled: bool) {
        self.record_stack_trace.set(enabled);
    }

    pub fn records_stack_trace(&self) -> bool {
        self.record_stack_trace.get()
    }

    /// Add `handler` for `M` when `should_subscribe` is true, otherwise remove
    /// its first registration.
    ///
    /// A handler subscribed twice is called twice per message. Removing a
    /// handler that is not subscribed does nothing.
    pub fn subscribe<M: Message>(&self, handler: &Handler<M>, should_subscribe: bool) {
        let key = Rc::as_ptr(handler) as *const ();
        let mut subscriptions = self.subscriptions.borrow_mut();
        let list = subscriptions.entry(MessageKind::of::<M>()).or_default();

        if should_subscribe {
            let invoke = erase(Rc::clone(handler));
            list.push(Subscription { key, invoke });
        } else if let Some(position) = list.iter().position(|s| s.key == key) {
            list.remove(position);
        }
    }

    /// Whether any handler is subscribed to `M`.
    pub fn has_subscriptions<M: Message>(&self) -> bool {
        self.subscriptions
            .borrow()
            .get(&MessageKind::of::<M>())
            .is_some_and(|list| !list.is_empty())
    }

    /// Queue `message` for the next [`update`](Self::update).
    pub fn enqueue<M: Message>(&self, message: M) {
        let queued_stack = self.record_stack_trace.get().then(StackSnapshot::capture);

        self.queue.borrow_mut().push_back(QueuedMessage {
            kind: MessageKind::of::<M>(),
            message: Box::new(message),
            queued_stack,
        });
    }

    /// Deliver `message` to every handler of its kind right now, in
    /// subscription order.
    ///
    /// The first handler error stops delivery and is returned as is. Messages
    /// the handlers enqueue are left for the next drain.
    pub fn publish<M: Message>(&self, message: &mut M) -> HandlerResult {
        self.publish_erased(MessageKind::of::<M>(), message)
    }

    fn publish_erased(&self, kind: MessageKind, message: &mut dyn Any) -> HandlerResult {
        // Snapshot so handlers can change subscriptions mid-dispatch.
        let handlers: Vec<ErasedHandler> = self
            .subscriptions
            .borrow()
            .get(&kind)
            .map(|list| list.iter().map(|s| Rc::clone(&s.invoke)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(%kind, "message sent without listener");
            return Ok(());
        }

        for invoke in handlers {
            invoke(&mut *message)?;
        }
        Ok(())
    }

    /// Drain the queue once. Call this once per tick.
    ///
    /// Only the messages queued before the call are delivered; anything
    /// enqueued while draining waits for the next call.
    ///
    /// # Errors
    ///
    /// If a handler fails, draining stops and
    /// [`DispatchError::MessageHandlingFailure`] is returned. The messages
    /// that were still pending in this drain's snapshot are discarded, not
    /// retried.
    pub fn update(&self) -> Result<(), DispatchError> {
        let pending = self.queue.borrow().len();

        for delivered in 0..pending {
            let next = self.queue.borrow_mut().pop_front();
            let Some(mut queued) = next else {
                break;
            };

            if let Err(source) = self.publish_erased(queued.kind, &mut *queued.message) {
                let dropped = self.discard_front(pending - delivered - 1);
                if dropped > 0 {
                    warn!(
                        kind = %queued.kind,
                        dropped,
                        "dropping queued messages after handler failure"
                    );
                }
                return Err(DispatchError::MessageHandlingFailure {
                    kind: queued.kind.name(),
                    source,
                    queued_stack: queued.queued_stack,
                });
            }
        }
        Ok(())
    }

    fn discard_front(&self, count: usize) -> usize {
        let mut queue = self.queue.borrow_mut();
        let count = count.min(queue.len());
        queue.drain(..count);
        count
    }

    /// Number of messages waiting for the next drain.
    pub fn pending_messages(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Drop every subscription for every kind.
    pub fn unsubscribe_from_all_messages(&self) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        for list in subscriptions.values_mut() {
            list.clear();
        }
        subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct SetValue(i32);
    impl Message for SetValue {}

    struct Ignored;
    impl Message for Ignored {}

    struct Fail;
    impl Message for Fail {}

    #[test]
    fn publish_without_subscribers_is_silent() {
        let dispatcher = MessageDispatcher::new();

        assert!(!dispatcher.has_subscriptions::<Ignored>());
        assert!(dispatcher.publish(&mut Ignored).is_ok());

        dispatcher.enqueue(Ignored);
        assert!(dispatcher.update().is_ok());
        assert_eq!(dispatcher.pending_messages(), 0);
    }

    #[test]
    fn subscribe_publish_unsubscribe() {
        let dispatcher = MessageDispatcher::new();
        let current = Rc::new(Cell::new(7));

        let sink = Rc::clone(&current);
        let set_value = handler(move |m: &mut SetValue| {
            sink.set(m.0);
            Ok(())
        });

        dispatcher.subscribe(&set_value, true);
        assert!(dispatcher.has_subscriptions::<SetValue>());
        dispatcher.publish(&mut SetValue(3)).unwrap();
        assert_eq!(current.get(), 3);

        current.set(7);
        dispatcher.subscribe(&set_value, false);
        assert!(!dispatcher.has_subscriptions::<SetValue>());
        dispatcher.publish(&mut SetValue(3)).unwrap();
        assert_eq!(current.get(), 7);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let dispatcher = MessageDispatcher::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let handlers: Vec<Handler<SetValue>> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                handler(move |_: &mut SetValue| {
                    order.borrow_mut().push(i);
                    Ok(())
                })
            })
            .collect();

        for h in &handlers {
            dispatcher.subscribe(h, true);
        }
        dispatcher.publish(&mut SetValue(0)).unwrap();

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let dispatcher = MessageDispatcher::new();
        let hits = Rc::new(RefCell::new(Vec::new()));

        let first_hits = Rc::clone(&hits);
        let first = handler(move |_: &mut SetValue| {
            first_hits.borrow_mut().push("first");
            Ok(())
        });
        let second_hits = Rc::clone(&hits);
        let second = handler(move |_: &mut SetValue| {
            second_hits.borrow_mut().push("second");
            Ok(())
        });

        dispatcher.subscribe(&first, true);
        dispatcher.subscribe(&second, true);
        dispatcher.subscribe(&first, false);
        dispatcher.publish(&mut SetValue(1)).unwrap();

        assert_eq!(*hits.borrow(), vec!["second"]);
    }

    #[test]
    fn duplicate_subscription_runs_twice_and_unsubscribes_once() {
        let dispatcher = MessageDispatcher::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let count = handler(move |_: &mut SetValue| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        dispatcher.subscribe(&count, true);
        dispatcher.subscribe(&count, true);
        dispatcher.publish(&mut SetValue(0)).unwrap();
        assert_eq!(calls.get(), 2);

        dispatcher.subscribe(&count, false);
        dispatcher.publish(&mut SetValue(0)).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn unsubscribing_unknown_handler_is_a_no_op() {
        let dispatcher = MessageDispatcher::new();
        let never = handler(|_: &mut SetValue| Ok(()));

        dispatcher.subscribe(&never, false);

        assert!(!dispatcher.has_subscriptions::<SetValue>());
    }

    #[test]
    fn update_defers_messages_enqueued_while_draining() {
        let dispatcher = Rc::new(MessageDispatcher::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = Rc::clone(&dispatcher);
        let log = Rc::clone(&seen);
        let echo = handler(move |m: &mut SetValue| {
            log.borrow_mut().push(m.0);
            if m.0 < 3 {
                inner.enqueue(SetValue(m.0 + 1));
            }
            Ok(())
        });
        dispatcher.subscribe(&echo, true);

        dispatcher.enqueue(SetValue(1));
        dispatcher.update().unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(dispatcher.pending_messages(), 1);

        dispatcher.update().unwrap();
        dispatcher.update().unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert_eq!(dispatcher.pending_messages(), 0);
    }

    #[test]
    fn handler_can_unsubscribe_itself_during_dispatch() {
        let dispatcher = Rc::new(MessageDispatcher::new());
        let calls = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Handler<SetValue>>>> = Rc::new(RefCell::new(None));

        let inner = Rc::clone(&dispatcher);
        let me = Rc::clone(&slot);
        let counter = Rc::clone(&calls);
        let once = handler(move |_: &mut SetValue| {
            counter.set(counter.get() + 1);
            if let Some(this) = me.borrow().as_ref() {
                inner.subscribe(this, false);
            }
            Ok(())
        });
        *slot.borrow_mut() = Some(Rc::clone(&once));
        dispatcher.subscribe(&once, true);

        dispatcher.publish(&mut SetValue(0)).unwrap();
        dispatcher.publish(&mut SetValue(0)).unwrap();

        assert_eq!(calls.get(), 1);
        slot.borrow_mut().take();
    }

    #[test]
    fn direct_publish_returns_handler_error_unwrapped() {
        let dispatcher = MessageDispatcher::new();
        let fail = handler(|_: &mut Fail| Err("boom".into()));
        dispatcher.subscribe(&fail, true);

        let err = dispatcher.publish(&mut Fail).unwrap_err();

        assert_eq!(err.to_string(), "boom");
    }

    #[inline(never)]
    fn enqueue_failing_message(dispatcher: &MessageDispatcher) {
        dispatcher.enqueue(Fail);
    }

    #[test]
    fn failing_handler_without_stack_capture() {
        let dispatcher = MessageDispatcher::new();
        let fail = handler(|_: &mut Fail| Err("testing handlers that fail".into()));
        dispatcher.subscribe(&fail, true);

        enqueue_failing_message(&dispatcher);
        let err = dispatcher.update().unwrap_err();

        assert!(matches!(err, DispatchError::MessageHandlingFailure { .. }));
        assert_eq!(err.handler_error().to_string(), "testing handlers that fail");
        assert!(err.queued_stack().is_none());
    }

    #[test]
    fn failing_handler_with_stack_capture_records_enqueue_site() {
        let dispatcher = MessageDispatcher::new();
        let fail = handler(|_: &mut Fail| Err("testing handlers that fail".into()));
        dispatcher.subscribe(&fail, true);
        dispatcher.set_record_stack_trace(true);

        enqueue_failing_message(&dispatcher);
        let err = dispatcher.update().unwrap_err();

        let stack = err.queued_stack().expect("stack captured at enqueue");
        assert!(stack.to_string().contains("enqueue_failing_message"));
    }

    #[test]
    fn failure_drops_rest_of_snapshot_but_keeps_later_messages() {
        let dispatcher = Rc::new(MessageDispatcher::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        let inner = Rc::clone(&dispatcher);
        let record = handler(move |m: &mut SetValue| {
            log.borrow_mut().push(m.0);
            if m.0 == 1 {
                inner.enqueue(SetValue(100));
            }
            Ok(())
        });
        let fail = handler(|_: &mut Fail| Err("boom".into()));
        dispatcher.subscribe(&record, true);
        dispatcher.subscribe(&fail, true);

        dispatcher.enqueue(SetValue(1));
        dispatcher.enqueue(Fail);
        dispatcher.enqueue(SetValue(2));
        dispatcher.enqueue(SetValue(3));

        assert!(dispatcher.update().is_err());
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(dispatcher.pending_messages(), 1);

        dispatcher.update().unwrap();
        assert_eq!(*seen.borrow(), vec![1, 100]);
    }

    #[test]
    fn unsubscribe_from_all_messages_resets_table() {
        let dispatcher = MessageDispatcher::new();
        let a = handler(|_: &mut SetValue| Ok(()));
        let b = handler(|_: &mut Fail| Ok(()));
        dispatcher.subscribe(&a, true);
        dispatcher.subscribe(&b, true);

        dispatcher.unsubscribe_from_all_messages();

        assert!(!dispatcher.has_subscriptions::<SetValue>());
        assert!(!dispatcher.has_subscriptions::<Fail>());
    }
}
