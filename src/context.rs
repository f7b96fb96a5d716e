//! Diagnostics configuration and the context shared by every state.

use crate::message::MessageDispatcher;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Diagnostic switches. Both default to off.
///
/// ```rust
/// use stepwise::Diagnostics;
///
/// let diagnostics = Diagnostics::from_json(r#"{ "report_transitions": true }"#).unwrap();
/// assert!(diagnostics.report_transitions);
/// assert!(!diagnostics.record_stack_traces);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Log every state enter, exit and step completion.
    pub report_transitions: bool,

    /// Capture a stack snapshot for every enqueued message.
    pub record_stack_traces: bool,
}

impl Diagnostics {
    /// Parse diagnostics from a JSON object. Missing fields stay off.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Everything a state needs from its surroundings: the shared dispatcher and
/// the diagnostics configuration.
///
/// Cloning is cheap and every clone shares the same dispatcher.
#[derive(Clone)]
pub struct StateContext {
    dispatcher: Rc<MessageDispatcher>,
    diagnostics: Diagnostics,
}

impl StateContext {
    /// Create a context with a fresh dispatcher configured from `diagnostics`.
    pub fn new(diagnostics: Diagnostics) -> Self {
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_record_stack_trace(diagnostics.record_stack_traces);
        Self::with_dispatcher(Rc::new(dispatcher), diagnostics)
    }

    /// Create a context around an existing dispatcher.
    ///
    /// The dispatcher's stack capture setting is left untouched.
    pub fn with_dispatcher(dispatcher: Rc<MessageDispatcher>, diagnostics: Diagnostics) -> Self {
        Self {
            dispatcher,
            diagnostics,
        }
    }

    pub fn dispatcher(&self) -> &Rc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub fn reports_transitions(&self) -> bool {
        self.diagnostics.report_transitions
    }
}

impl Default for StateContext {
    fn default() -> Self {
        Self::new(Diagnostics::default())
    }
}
