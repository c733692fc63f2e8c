//! Property-based tests for the engine and the concrete machines.
//!
//! These tests use proptest to drive the machines against the simulated
//! board with randomly generated timings, melodies and payloads.

use pollfsm::builder::{TableBuilder, TransitionBuilder};
use pollfsm::engine::{Fsm, Machine, StepResult};
use pollfsm::machines::{
    scaled_duration, ButtonFsm, ButtonState, BuzzerFsm, BuzzerState, PlayerAction, UsartFsm,
};
use pollfsm::melody::{Melody, Note};
use pollfsm::port::sim::SimPort;
use pollfsm::port::{EMPTY_BYTE, INPUT_BUFFER_LEN, OUTPUT_BUFFER_LEN};
use pollfsm::state_enum;
use proptest::prelude::*;
use std::sync::Arc;

const DEBOUNCE_MS: u32 = 150;
const END: u8 = 0x0A;

state_enum! {
    enum Slot {
        A,
        B,
        C,
        D,
    }
    idle: [A]
}

fn slot(i: u8) -> Slot {
    match i % 4 {
        0 => Slot::A,
        1 => Slot::B,
        2 => Slot::C,
        _ => Slot::D,
    }
}

prop_compose! {
    fn arbitrary_note()(frequency in 0.0..4000.0f64, duration in 1..2000u32) -> Note {
        Note::new(frequency, duration)
    }
}

prop_compose! {
    fn arbitrary_melody()(notes in prop::collection::vec(arbitrary_note(), 1..12)) -> Melody {
        Melody::new("generated", notes).unwrap()
    }
}

prop_compose! {
    /// Payload bytes that are neither the end marker nor the empty filler.
    fn payload(max: usize)(bytes in prop::collection::vec(1..=255u8, 0..max)) -> Vec<u8> {
        bytes.into_iter().filter(|&b| b != END).collect()
    }
}

fn step_until<M: Machine>(machine: &mut M, state: M::State, port: &SimPort, limit: u32) -> bool {
    for _ in 0..limit {
        if machine.state() == state {
            return true;
        }
        machine.step();
        port.on_systick();
    }
    machine.state() == state
}

proptest! {
    #[test]
    fn first_matching_rule_wins(
        guards in prop::collection::vec(any::<bool>(), 1..8),
        targets in prop::collection::vec(0..4u8, 8),
    ) {
        let mut builder = TableBuilder::<Slot, Vec<bool>>::new();
        for (i, _) in guards.iter().enumerate() {
            builder = builder
                .transition(
                    TransitionBuilder::new()
                        .from(Slot::A)
                        .when(move |g: &Vec<bool>| g[i])
                        .to(slot(targets[i])),
                )
                .unwrap();
        }
        let mut fsm = Fsm::new(builder.build().unwrap());
        let mut ctx = guards.clone();

        let result = fsm.step(&mut ctx);

        match guards.iter().position(|&g| g) {
            Some(i) => {
                prop_assert_eq!(result.rule(), Some(i));
                prop_assert_eq!(fsm.current_state(), slot(targets[i]));
            }
            None => {
                prop_assert_eq!(result, StepResult::Idle);
                prop_assert_eq!(fsm.current_state(), Slot::A);
            }
        }
    }

    #[test]
    fn press_duration_equals_elapsed(start in any::<u32>(), held in DEBOUNCE_MS + 1..60_000u32) {
        let port = Arc::new(SimPort::default());
        let mut button = ButtonFsm::new(Arc::clone(&port), DEBOUNCE_MS, 0).unwrap();

        port.set_tick(start);
        port.press(0);
        button.step();
        port.set_tick(start.wrapping_add(held));
        button.step();
        prop_assert_eq!(button.state(), ButtonState::Pressed);

        port.release(0);
        button.step();
        prop_assert_eq!(button.get_duration(), held);
    }

    #[test]
    fn short_press_returns_to_released(held in 0..DEBOUNCE_MS) {
        let port = Arc::new(SimPort::default());
        let mut button = ButtonFsm::new(Arc::clone(&port), DEBOUNCE_MS, 0).unwrap();

        port.press(0);
        button.step();
        port.advance_ms(held);
        port.release(0);

        prop_assert!(step_until(&mut button, ButtonState::Pressed, &port, 400));
        prop_assert!(step_until(&mut button, ButtonState::ReleasedWait, &port, 10));
        prop_assert!(step_until(&mut button, ButtonState::Released, &port, 400));
        prop_assert!(!button.check_activity());
    }

    #[test]
    fn reset_duration_is_idempotent(held in DEBOUNCE_MS + 1..5000u32, resets in 1..5usize) {
        let port = Arc::new(SimPort::default());
        let mut button = ButtonFsm::new(Arc::clone(&port), DEBOUNCE_MS, 0).unwrap();

        port.press(0);
        button.step();
        port.advance_ms(held);
        button.step();
        port.release(0);
        button.step();

        for _ in 0..resets {
            button.reset_duration();
            prop_assert_eq!(button.get_duration(), 0);
        }
    }

    #[test]
    fn melody_plays_each_note_once(melody in arbitrary_melody()) {
        let port = Arc::new(SimPort::default());
        let mut buzzer = BuzzerFsm::new(Arc::clone(&port), 0).unwrap();
        buzzer.set_melody(&melody);
        buzzer.set_action(PlayerAction::Play);

        let mut indices = Vec::new();
        for _ in 0..melody.len() {
            buzzer.step();
            prop_assert_eq!(buzzer.state(), BuzzerState::WaitNote);
            indices.push(buzzer.note_index());
            port.expire_note(0);
            buzzer.step();
            prop_assert_eq!(buzzer.state(), BuzzerState::PlayNote);
        }
        buzzer.step();

        let expected: Vec<usize> = (1..=melody.len()).collect();
        prop_assert_eq!(indices, expected);
        prop_assert_eq!(buzzer.state(), BuzzerState::WaitMelody);
        prop_assert_eq!(buzzer.note_index(), 0);
        prop_assert_eq!(buzzer.get_action(), PlayerAction::Stop);
        prop_assert!(!buzzer.check_activity());
        prop_assert_eq!(port.programmed_notes(0).len(), melody.len());
    }

    #[test]
    fn delivered_duration_is_rounded_quotient(melody in arbitrary_melody(), speed in 0.25..8.0f64) {
        let port = Arc::new(SimPort::default());
        let mut buzzer = BuzzerFsm::new(Arc::clone(&port), 0).unwrap();
        buzzer.set_melody(&melody);
        buzzer.set_speed(speed).unwrap();
        buzzer.set_action(PlayerAction::Play);

        buzzer.step();
        for _ in 1..melody.len() {
            port.expire_note(0);
            buzzer.step();
            buzzer.step();
        }

        let delivered: Vec<u32> = port.programmed_notes(0).iter().map(|n| n.duration_ms).collect();
        let expected: Vec<u32> = melody
            .notes()
            .iter()
            .map(|n| (f64::from(n.duration_ms) / speed).round() as u32)
            .collect();
        prop_assert_eq!(&delivered, &expected);
        prop_assert!(melody.notes().iter().zip(&delivered).all(|(n, &d)| d == scaled_duration(n.duration_ms, speed)));
    }

    #[test]
    fn pause_preserves_note_index(melody in arbitrary_melody(), played in 0..12usize) {
        let port = Arc::new(SimPort::default());
        let mut buzzer = BuzzerFsm::new(Arc::clone(&port), 0).unwrap();
        buzzer.set_melody(&melody);
        buzzer.set_action(PlayerAction::Play);
        buzzer.step();

        let played = played % melody.len();
        for _ in 0..played {
            port.expire_note(0);
            buzzer.step();
            buzzer.step();
        }
        port.expire_note(0);
        buzzer.step();
        let index = buzzer.note_index();

        buzzer.set_action(PlayerAction::Pause);
        buzzer.step();
        prop_assert_eq!(buzzer.state(), BuzzerState::PauseNote);
        prop_assert_eq!(buzzer.note_index(), index);
        prop_assert_eq!(port.pwm_frequency(0), None);

        buzzer.set_action(PlayerAction::Play);
        buzzer.step();
        prop_assert_eq!(buzzer.state(), BuzzerState::PlayNote);
        prop_assert_eq!(buzzer.note_index(), index);
    }

    #[test]
    fn received_message_is_zero_padded(message in payload(INPUT_BUFFER_LEN + 1)) {
        let port = Arc::new(SimPort::default());
        let mut usart = UsartFsm::new(Arc::clone(&port), 0).unwrap();
        usart.enable_rx_interrupt();

        let message = &message[..message.len().min(INPUT_BUFFER_LEN)];
        port.deliver(0, message);
        port.on_rx_byte(0, END);
        usart.step();

        prop_assert!(usart.check_data_received());
        let data = usart.get_in_data();
        prop_assert_eq!(&data[..message.len()], message);
        prop_assert!(data[message.len()..].iter().all(|&b| b == EMPTY_BYTE));
        prop_assert!(!usart.is_truncated());

        usart.reset_input_data();
        prop_assert!(!usart.check_data_received());
        prop_assert_eq!(usart.get_in_data(), [EMPTY_BYTE; INPUT_BUFFER_LEN]);
    }

    #[test]
    fn sent_message_reaches_the_wire(body in payload(OUTPUT_BUFFER_LEN)) {
        let port = Arc::new(SimPort::default());
        let mut usart = UsartFsm::new(Arc::clone(&port), 0).unwrap();

        let mut message = body[..body.len().min(OUTPUT_BUFFER_LEN - 1)].to_vec();
        message.push(END);
        usart.set_out_data(&message).unwrap();

        usart.step();
        prop_assert!(usart.check_activity());

        let wire = port.flush_tx(0);
        prop_assert_eq!(&wire, &message);

        usart.step();
        prop_assert!(!usart.check_activity());
        prop_assert_eq!(usart.step(), StepResult::Idle);
    }
}
