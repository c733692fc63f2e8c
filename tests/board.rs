//! Whole-board scenarios against the simulated port.

use pollfsm::config::BoardConfig;
use pollfsm::engine::Machine;
use pollfsm::machines::{
    BlinkFsm, ButtonFsm, ButtonState, BuzzerFsm, BuzzerState, LedToggleFsm, PlayerAction, UsartFsm,
    UsartState,
};
use pollfsm::melody::Melody;
use pollfsm::port::sim::SimPort;
use pollfsm::port::UnitKind;
use pollfsm::FsmError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BOARD: &str = r#"{
    "buttons": [{ "id": 0, "debounce_ms": 100 }],
    "buzzers": [{ "id": 1, "speed": 2.0 }],
    "usarts": [{ "id": 0, "end_byte": 13, "overflow": "discard" }],
    "leds": [{ "id": 0, "min_press_ms": 500 }, { "id": 1, "blink_period_ms": 200 }]
}"#;

#[test]
fn machines_from_configuration() {
    let config = BoardConfig::from_json(BOARD).unwrap();
    let port = Arc::new(SimPort::new(&config).unwrap());

    let button = ButtonFsm::from_config(Arc::clone(&port), &config.buttons[0]).unwrap();
    let buzzer = BuzzerFsm::from_config(Arc::clone(&port), &config.buzzers[0]).unwrap();
    let _usart = UsartFsm::from_config(Arc::clone(&port), &config.usarts[0]).unwrap();
    let led = LedToggleFsm::from_config(Arc::clone(&port), button.duration_handle(), &config.leds[0]).unwrap();
    let blink = BlinkFsm::from_config(Arc::clone(&port), &config.leds[1]).unwrap();

    assert_eq!(button.debounce_ms(), 100);
    assert_eq!(buzzer.id(), 1);
    assert_eq!(buzzer.speed(), 2.0);
    assert_eq!(led.min_duration_ms(), 500);
    assert_eq!(blink.period_ms(), 200);

    // Buzzer 0 is not on this board
    let missing = BuzzerFsm::new(Arc::clone(&port), 0);
    assert!(matches!(missing, Err(FsmError::Port(_))));
}

#[test]
fn custom_end_byte_frames_messages() {
    let config = BoardConfig::from_json(BOARD).unwrap();
    let port = Arc::new(SimPort::new(&config).unwrap());
    let mut usart = UsartFsm::from_config(Arc::clone(&port), &config.usarts[0]).unwrap();
    usart.enable_rx_interrupt();

    port.deliver(0, b"AT\n\r");
    usart.step();
    assert_eq!(usart.in_message(), b"AT\n");

    usart.reset_input_data();
    usart.set_out_data(b"OK\r").unwrap();
    usart.step();
    assert_eq!(port.flush_tx(0), b"OK\r");
}

#[test]
fn dropping_machines_frees_every_unit() {
    let port = Arc::new(SimPort::default());
    {
        let button = ButtonFsm::new(Arc::clone(&port), 150, 0).unwrap();
        let _buzzer = BuzzerFsm::new(Arc::clone(&port), 0).unwrap();
        let _usart = UsartFsm::new(Arc::clone(&port), 0).unwrap();
        let _led = LedToggleFsm::new(Arc::clone(&port), button.duration_handle(), 1000, 0).unwrap();

        for kind in [UnitKind::Button, UnitKind::Buzzer, UnitKind::Usart, UnitKind::Led] {
            assert!(port.is_bound(kind, 0));
        }
    }

    for kind in [UnitKind::Button, UnitKind::Buzzer, UnitKind::Usart, UnitKind::Led] {
        assert!(!port.is_bound(kind, 0));
    }
}

#[test]
fn interrupts_from_another_thread() {
    let port = Arc::new(SimPort::default());
    let melody = Melody::from_pairs("short", &[(523.25, 30), (659.25, 30), (783.99, 30)]).unwrap();

    let mut button = ButtonFsm::new(Arc::clone(&port), 150, 0).unwrap();
    let mut buzzer = BuzzerFsm::new(Arc::clone(&port), 0).unwrap();
    let mut usart = UsartFsm::new(Arc::clone(&port), 0).unwrap();
    usart.enable_rx_interrupt();
    buzzer.set_melody(&melody);
    buzzer.set_action(PlayerAction::Play);

    let release_now = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicBool::new(false));

    let isr = {
        let port = Arc::clone(&port);
        let release_now = Arc::clone(&release_now);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            port.deliver(0, b"ping\n");
            port.press(0);
            let mut released = false;
            while !done.load(Ordering::Acquire) {
                if !released && release_now.load(Ordering::Acquire) {
                    port.release(0);
                    released = true;
                }
                port.on_systick();
                port.on_tx_ready(0);
                thread::sleep(Duration::from_micros(20));
            }
        })
    };

    let deadline = Instant::now() + Duration::from_secs(20);
    let mut replied = false;
    let mut sent = false;
    while Instant::now() < deadline {
        button.step();
        buzzer.step();
        usart.step();

        if usart.state() == UsartState::SendData {
            sent = true;
        }
        if button.state() == ButtonState::Pressed {
            release_now.store(true, Ordering::Release);
        }
        if usart.check_data_received() && !replied {
            assert_eq!(usart.in_message(), b"ping");
            usart.reset_input_data();
            usart.set_out_data(b"pong\n").unwrap();
            replied = true;
        }

        let settled = sent
            && !usart.check_activity()
            && !button.check_activity()
            && button.get_duration() > 0
            && buzzer.state() == BuzzerState::WaitMelody;
        if settled {
            break;
        }
        thread::yield_now();
    }

    done.store(true, Ordering::Release);
    isr.join().unwrap();

    assert!(replied);
    assert_eq!(port.transmitted(0), b"pong\n");
    assert!(button.get_duration() > 150);
    assert_eq!(buzzer.state(), BuzzerState::WaitMelody);
    assert_eq!(port.programmed_notes(0).len(), 3);
}
