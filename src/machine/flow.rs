//! Ready-made flows.

use crate::machine::error::StateError;
use crate::machine::fsm::{Flow, Machine, StateHandle};

/// Runs registered states one after another, in the given order, and
/// completes the machine after the last one.
///
/// The same id may appear more than once; the sequence tracks its position,
/// not the id it last saw.
///
/// ```rust
/// use stepwise::machine::{FiniteStateMachine, Sequence, State};
/// use stepwise::steps::TimedStep;
/// use stepwise::StateContext;
///
/// let context = StateContext::default();
/// let mut turn = FiniteStateMachine::new("Turn", &context, Sequence::new(["Wait", "Pause"]));
/// turn.register_state(TimedStep::new("Wait", &context, 1.0)).unwrap();
/// turn.register_state(TimedStep::new("Pause", &context, 0.5)).unwrap();
///
/// turn.enter(None).unwrap();
/// turn.update(1.0).unwrap();
/// assert_eq!(turn.current_state_id(), Some("Pause"));
/// turn.update(0.5).unwrap();
/// assert!(turn.was_complete_called());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    steps: Vec<String>,
    cursor: usize,
}

impl Sequence {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
            cursor: 0,
        }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Index of the step currently running.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl Flow for Sequence {
    fn on_enter(&mut self, machine: &mut Machine) -> Result<(), StateError> {
        self.cursor = 0;
        match self.steps.first() {
            Some(first) => machine.change_state_by_id(first),
            None => machine.complete(),
        }
    }

    fn on_state_complete(
        &mut self,
        completed: StateHandle,
        machine: &mut Machine,
    ) -> Result<(), StateError> {
        let expected = self.steps.get(self.cursor).map(String::as_str);

        // Not the step we started; leave it to whoever entered it.
        if expected.is_none() || machine.state_id(completed) != expected {
            return Ok(());
        }

        self.cursor += 1;
        match self.steps.get(self.cursor) {
            Some(next) => machine.change_state_by_id(next),
            None => machine.complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::fsm::FiniteStateMachine;
    use crate::machine::state::{CompletionSignal, State};
    use crate::steps::TimedStep;
    use crate::StateContext;

    #[test]
    fn empty_sequence_completes_on_enter() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new("Empty", &context, Sequence::default());
        let done = CompletionSignal::new();

        fsm.enter(Some(done.clone())).unwrap();

        assert!(done.is_fired());
        assert!(fsm.current_state().is_none());
    }

    #[test]
    fn unknown_step_id_surfaces_on_enter() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new("Broken", &context, Sequence::new(["Missing"]));

        let err = fsm.enter(None).unwrap_err();

        assert!(matches!(err, StateError::UnknownStateId { ref id, .. } if id == "Missing"));
    }

    #[test]
    fn zero_length_steps_advance_once_per_update() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new(
            "Burst",
            &context,
            Sequence::new(["First", "Second", "Third"]),
        );
        fsm.register_state(TimedStep::new("First", &context, 0.0)).unwrap();
        fsm.register_state(TimedStep::new("Second", &context, 0.0)).unwrap();
        fsm.register_state(TimedStep::new("Third", &context, 1.0)).unwrap();

        fsm.enter(None).unwrap();
        fsm.update(0.0).unwrap();

        assert_eq!(fsm.current_state_id(), Some("Second"));
        fsm.update(0.0).unwrap();
        assert_eq!(fsm.current_state_id(), Some("Third"));
    }

    #[test]
    fn reentering_restarts_from_the_first_step() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new("Loop", &context, Sequence::new(["A", "B"]));
        fsm.register_state(TimedStep::new("A", &context, 1.0)).unwrap();
        fsm.register_state(TimedStep::new("B", &context, 1.0)).unwrap();

        fsm.enter(None).unwrap();
        fsm.update(1.0).unwrap();
        fsm.update(1.0).unwrap();
        assert!(fsm.was_complete_called());

        fsm.enter(None).unwrap();
        assert!(!fsm.was_complete_called());
        assert_eq!(fsm.current_state_id(), Some("A"));
    }

    #[test]
    fn repeated_step_ids_run_in_order_and_complete() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new(
            "Reroll",
            &context,
            Sequence::new(["Roll", "Resolve", "Roll"]),
        );
        fsm.register_state(TimedStep::new("Roll", &context, 1.0)).unwrap();
        fsm.register_state(TimedStep::new("Resolve", &context, 1.0)).unwrap();
        let done = CompletionSignal::new();

        fsm.enter(Some(done.clone())).unwrap();
        let mut visited = Vec::new();
        for _ in 0..6 {
            if let Some(id) = fsm.current_state_id() {
                visited.push(id.to_string());
            }
            fsm.update(1.0).unwrap();
        }

        assert_eq!(visited, vec!["Roll", "Resolve", "Roll"]);
        assert!(done.is_fired());
        assert_eq!(fsm.flow().position(), 3);
    }

    #[test]
    fn completion_of_a_step_out_of_turn_is_ignored() {
        let context = StateContext::default();
        let mut fsm = FiniteStateMachine::new("Turn", &context, Sequence::new(["A", "B"]));
        fsm.register_state(TimedStep::new("A", &context, 1.0)).unwrap();
        fsm.register_state(TimedStep::new("B", &context, 1.0)).unwrap();
        fsm.register_state(TimedStep::new("Detour", &context, 0.0)).unwrap();

        fsm.enter(None).unwrap();
        fsm.change_state_by_id("Detour").unwrap();
        fsm.update(0.0).unwrap();

        assert_eq!(fsm.current_state_id(), Some("Detour"));
        assert_eq!(fsm.flow().position(), 0);
    }
}
