//! Turn Sequence
//!
//! This example drives a small turn through the per-tick driver.
//!
//! Key concepts:
//! - A `Sequence` flow over registered steps
//! - Request/response messages answered by a handler
//! - The driver's tick order: states first, then the message drain
//!
//! Run with: cargo run --example turn_sequence

use std::cell::Cell;
use std::rc::Rc;
use stepwise::machine::{CompletionSignal, FiniteStateMachine, Sequence};
use stepwise::message::{handler, Message, MessageWithCallback, ResponseCallback};
use stepwise::steps::{
    CreateMessageWithResponse, SendMessageStep, SendMessageWithResponseStep, TimedStep,
};
use stepwise::{Diagnostics, Driver, StateContext};

struct RollDice {
    total: u32,
    on_complete: Option<ResponseCallback<RollDice>>,
}

impl Message for RollDice {}

impl MessageWithCallback for RollDice {
    fn take_callback(&mut self) -> Option<ResponseCallback<Self>> {
        self.on_complete.take()
    }
}

struct RollRequest;

impl CreateMessageWithResponse for RollRequest {
    type Message = RollDice;
    type Response = u32;

    fn create_message(&mut self, on_response: ResponseCallback<RollDice>) -> RollDice {
        RollDice {
            total: 0,
            on_complete: Some(on_response),
        }
    }

    fn read_response(message: &RollDice) -> u32 {
        message.total
    }
}

struct PlaySoundEffect(&'static str);

impl Message for PlaySoundEffect {}

fn main() {
    println!("=== Turn Sequence ===\n");

    let context = StateContext::new(Diagnostics::default());
    let dispatcher = Rc::clone(context.dispatcher());

    // The "game" side answers rolls and plays sounds.
    let roll = handler(|m: &mut RollDice| {
        m.total = 7;
        println!("  [handler] rolled {}", m.total);
        m.complete();
        Ok(())
    });
    let play = handler(|m: &mut PlaySoundEffect| {
        println!("  [handler] playing '{}'", m.0);
        Ok(())
    });
    dispatcher.subscribe(&roll, true);
    dispatcher.subscribe(&play, true);

    let roll_step = SendMessageWithResponseStep::new("Roll", &context, RollRequest);
    let pause = TimedStep::new("Pause", &context, 1.0);
    let fanfare = SendMessageStep::new("Fanfare", &context, || PlaySoundEffect("fanfare"));

    let sequence = Sequence::new(["Roll", "Pause", "Fanfare"]);
    let mut turn = FiniteStateMachine::new("Turn", &context, sequence);
    turn.register_state(roll_step).unwrap();
    turn.register_state(pause).unwrap();
    turn.register_state(fanfare).unwrap();

    let ticks = Rc::new(Cell::new(0u32));
    let finished_at = Rc::clone(&ticks);
    let done = CompletionSignal::with_callback(move || {
        println!("  turn complete after {} ticks", finished_at.get());
    });

    let mut driver = Driver::new(turn, dispatcher);
    driver.start(Some(done.clone())).unwrap();

    while !done.is_fired() {
        ticks.set(ticks.get() + 1);
        let before = driver.root().current_state_id().unwrap_or("-").to_string();
        driver.tick(0.5).unwrap();
        let after = driver.root().current_state_id().unwrap_or("-");
        println!("tick {}: {} -> {}", ticks.get(), before, after);
    }

    println!("\nPath: {:?}", driver.root().history().get_path());
    println!("\n=== Example Complete ===");
}
