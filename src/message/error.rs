//! Dispatch error types.

use std::backtrace::Backtrace;
use std::fmt;
use thiserror::Error;

/// Error returned by a message handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type of a message handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Call stack captured when a message was enqueued.
///
/// Only recorded while the dispatcher has stack capture turned on.
pub struct StackSnapshot(Backtrace);

impl StackSnapshot {
    pub(crate) fn capture() -> Self {
        Self(Backtrace::force_capture())
    }

    /// The underlying backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.0
    }
}

impl fmt::Debug for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors raised while draining the message queue.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler failed while a queued message was being delivered.
    ///
    /// The rest of that drain's snapshot was dropped.
    #[error("failed to handle queued message of kind {kind}: {source}")]
    MessageHandlingFailure {
        kind: &'static str,
        #[source]
        source: HandlerError,
        queued_stack: Option<StackSnapshot>,
    },
}

impl DispatchError {
    /// Stack recorded when the failing message was enqueued, if any.
    pub fn queued_stack(&self) -> Option<&StackSnapshot> {
        match self {
            Self::MessageHandlingFailure { queued_stack, .. } => queued_stack.as_ref(),
        }
    }

    /// The handler's original error.
    pub fn handler_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            Self::MessageHandlingFailure { source, .. } => source.as_ref(),
        }
    }
}
