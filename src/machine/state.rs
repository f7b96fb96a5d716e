//! The `State` trait, completion signals, and the `Step` building block.

use crate::context::StateContext;
use crate::machine::error::StateError;
use crate::message::MessageDispatcher;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A unit of behaviour that a [`FiniteStateMachine`](super::FiniteStateMachine)
/// can enter, tick and exit.
///
/// States are entered and exited any number of times over their life.
/// `on_complete` is handed in fresh on every `enter`; states that never finish
/// on their own can ignore it. Most states implement [`Step`] instead and get
/// this trait for free.
pub trait State {
    /// Identifier, unique within one machine.
    fn id(&self) -> &str;

    /// Called when the owning machine changes into this state.
    fn enter(&mut self, on_complete: Option<CompletionSignal>) -> Result<(), StateError>;

    /// Called once per tick while this state is active.
    fn update(&mut self, delta_time: f32) -> Result<(), StateError>;

    /// Called when the owning machine leaves this state.
    fn exit(&mut self);

    /// Whether the state has completed since it was last entered.
    fn was_complete_called(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct SignalInner {
    fired: Cell<bool>,
    callback: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// One-shot completion notification shared between a state and whoever
/// entered it.
///
/// Clones observe the same signal. Firing more than once has no further
/// effect.
#[derive(Clone, Default)]
pub struct CompletionSignal {
    inner: Rc<SignalInner>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also runs `callback` the first time it fires.
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        let signal = Self::new();
        *signal.inner.callback.borrow_mut() = Some(Box::new(callback));
        signal
    }

    pub fn fire(&self) {
        if self.inner.fired.replace(true) {
            return;
        }
        let callback = self.inner.callback.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.get()
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("fired", &self.is_fired())
            .finish()
    }
}

/// Identity and context of a state, plus its transition logging.
pub struct StateCore {
    id: String,
    context: StateContext,
}

impl StateCore {
    pub fn new(id: impl Into<String>, context: &StateContext) -> Self {
        Self {
            id: id.into(),
            context: context.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &StateContext {
        &self.context
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        self.context.dispatcher()
    }

    /// Log the enter transition if reporting is on.
    pub fn log_enter(&self) {
        if self.context.reports_transitions() {
            debug!(state = %self.id, "entering state");
        }
    }

    /// Log the exit transition if reporting is on.
    pub fn log_exit(&self) {
        if self.context.reports_transitions() {
            debug!(state = %self.id, "exiting state");
        }
    }
}

/// Completion bookkeeping for a step.
///
/// The stored signal fires at most once per enter/exit cycle and is dropped
/// as soon as it fires.
pub struct StepCore {
    state: StateCore,
    on_complete: Option<CompletionSignal>,
    was_complete_called: bool,
    is_subscribed: bool,
}

impl StepCore {
    pub fn new(id: impl Into<String>, context: &StateContext) -> Self {
        Self {
            state: StateCore::new(id, context),
            on_complete: None,
            was_complete_called: false,
            is_subscribed: false,
        }
    }

    pub fn id(&self) -> &str {
        self.state.id()
    }

    pub fn context(&self) -> &StateContext {
        self.state.context()
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        self.state.dispatcher()
    }

    /// Start a new cycle.
    pub fn begin(&mut self, on_complete: Option<CompletionSignal>) {
        self.state.log_enter();
        self.was_complete_called = false;
        self.on_complete = on_complete;
    }

    /// End the current cycle.
    pub fn end(&mut self) {
        self.state.log_exit();
    }

    /// Mark the step complete and fire its signal.
    ///
    /// Returns `false` without doing anything if the step already completed
    /// in this cycle.
    pub fn complete(&mut self) -> bool {
        if self.was_complete_called {
            return false;
        }
        self.was_complete_called = true;

        if self.state.context().reports_transitions() {
            debug!(state = %self.state.id(), "completing step");
        }

        if let Some(signal) = self.on_complete.take() {
            signal.fire();
        }
        true
    }

    pub fn was_complete_called(&self) -> bool {
        self.was_complete_called
    }

    /// Whether the step's message subscriptions are currently active.
    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }

    fn set_subscribed(&mut self, subscribed: bool) {
        self.is_subscribed = subscribed;
    }
}

/// A state that does some work and then completes.
///
/// Implementors hold a [`StepCore`] and override only the hooks they need;
/// [`State`] is implemented for every `Step`.
///
/// ```rust
/// use stepwise::machine::{State, Step, StepCore};
/// use stepwise::StateContext;
///
/// struct Announce {
///     core: StepCore,
/// }
///
/// impl Step for Announce {
///     fn core(&self) -> &StepCore {
///         &self.core
///     }
///
///     fn core_mut(&mut self) -> &mut StepCore {
///         &mut self.core
///     }
///
///     fn should_auto_complete(&self) -> bool {
///         true
///     }
/// }
///
/// let context = StateContext::default();
/// let mut step = Announce { core: StepCore::new("Announce", &context) };
/// step.enter(None).unwrap();
/// step.update(0.0).unwrap();
/// assert!(step.was_complete_called());
/// ```
pub trait Step {
    fn core(&self) -> &StepCore;

    fn core_mut(&mut self) -> &mut StepCore;

    /// Checked on every update; when true the step completes itself.
    fn should_auto_complete(&self) -> bool {
        false
    }

    fn on_enter(&mut self) -> Result<(), StateError> {
        Ok(())
    }

    fn on_update(&mut self, _delta_time: f32) -> Result<(), StateError> {
        Ok(())
    }

    fn on_exit(&mut self) {}

    /// Subscribe (`true`, on enter) or unsubscribe (`false`, on exit) every
    /// message handler the step owns.
    ///
    /// Keeping both directions in one method means a subscription can't be
    /// added without its removal.
    fn subscribe_to_messages(&mut self, _should_subscribe: bool) {}
}

impl<T: Step> State for T {
    fn id(&self) -> &str {
        self.core().id()
    }

    fn enter(&mut self, on_complete: Option<CompletionSignal>) -> Result<(), StateError> {
        self.core_mut().begin(on_complete);
        self.subscribe_to_messages(true);
        self.core_mut().set_subscribed(true);
        self.on_enter()
    }

    fn update(&mut self, delta_time: f32) -> Result<(), StateError> {
        if self.should_auto_complete() && !self.core().was_complete_called() {
            self.core_mut().complete();
        }
        self.on_update(delta_time)
    }

    fn exit(&mut self) {
        self.core_mut().end();
        self.on_exit();
        self.subscribe_to_messages(false);
        self.core_mut().set_subscribed(false);
    }

    fn was_complete_called(&self) -> bool {
        self.core().was_complete_called()
    }
}
