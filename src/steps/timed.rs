//! Step that waits for a fixed amount of tick time.

use crate::context::StateContext;
use crate::machine::{StateError, Step, StepCore};

/// Completes once the delta times passed to `update` add up to the delay.
///
/// Useful to slow a sequence down enough for a player to follow it, like
/// holding dice results on screen for a second.
pub struct TimedStep {
    core: StepCore,
    delay_time_limit: f32,
    delay_time_so_far: f32,
    is_delay_completed: bool,
}

impl TimedStep {
    /// `delay_time_limit` is in the same unit as the `delta_time` passed to
    /// `update`, normally seconds.
    pub fn new(id: impl Into<String>, context: &StateContext, delay_time_limit: f32) -> Self {
        Self {
            core: StepCore::new(id, context),
            delay_time_limit,
            delay_time_so_far: 0.0,
            is_delay_completed: false,
        }
    }

    pub fn is_delay_completed(&self) -> bool {
        self.is_delay_completed
    }

    pub fn elapsed(&self) -> f32 {
        self.delay_time_so_far
    }
}

impl Step for TimedStep {
    fn core(&self) -> &StepCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore {
        &mut self.core
    }

    fn on_enter(&mut self) -> Result<(), StateError> {
        self.delay_time_so_far = 0.0;
        self.is_delay_completed = false;
        Ok(())
    }

    fn on_update(&mut self, delta_time: f32) -> Result<(), StateError> {
        if self.is_delay_completed {
            return Ok(());
        }

        self.delay_time_so_far += delta_time;
        if self.delay_time_so_far >= self.delay_time_limit {
            self.is_delay_completed = true;
            self.core.complete();
        }
        Ok(())
    }
}
