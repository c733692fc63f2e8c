//! Simulated board for host builds and tests.
//!
//! `SimPort` implements every port trait in memory. The methods prefixed
//! `on_` stand in for the interrupt handlers of the real board and may be
//! called from any thread while a polling loop steps the machines.
//!
//! ```rust
//! use pollfsm::port::sim::SimPort;
//! use pollfsm::port::{ButtonPort, Clock};
//!
//! let port = SimPort::default();
//! port.init_button(0)?;
//!
//! port.advance_ms(20);
//! port.on_button_edge(0, true);
//!
//! assert_eq!(port.get_tick(), 20);
//! assert!(port.is_pressed(0));
//! # Ok::<(), pollfsm::port::PortError>(())
//! ```

use crate::config::{BoardConfig, ConfigError, OverflowPolicy};
use crate::port::{
    tick_reached, ButtonPort, BuzzerPort, Clock, LedPort, PortError, UnitKind, UsartPort,
    EMPTY_BYTE, INPUT_BUFFER_LEN, MAX_UNITS, OUTPUT_BUFFER_LEN,
};
use critical_section::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A note as the buzzer hardware received it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgrammedNote {
    pub frequency_hz: f64,
    pub duration_ms: u32,
    /// Tick at which the note timer was armed.
    pub at: u32,
}

struct ButtonLine {
    bound: AtomicBool,
    pressed: AtomicBool,
}

#[derive(Default)]
struct NoteTimer {
    running: bool,
    deadline: u32,
    armed_at: u32,
    pending_duration: u32,
    pwm_hz: Option<f64>,
    notes: Vec<ProgrammedNote>,
    stops: u32,
}

struct BuzzerLine {
    bound: AtomicBool,
    note_end: AtomicBool,
    timer: Mutex<RefCell<NoteTimer>>,
}

struct UsartBuffers {
    input: [u8; INPUT_BUFFER_LEN],
    i_idx: usize,
    output: [u8; OUTPUT_BUFFER_LEN],
    o_idx: usize,
    wire: Vec<u8>,
}

impl Default for UsartBuffers {
    fn default() -> Self {
        Self {
            input: [EMPTY_BYTE; INPUT_BUFFER_LEN],
            i_idx: 0,
            output: [EMPTY_BYTE; OUTPUT_BUFFER_LEN],
            o_idx: 0,
            wire: Vec::new(),
        }
    }
}

struct UsartLine {
    bound: AtomicBool,
    end_byte: u8,
    overflow: OverflowPolicy,
    rx_done: AtomicBool,
    tx_done: AtomicBool,
    rx_irq: AtomicBool,
    tx_irq: AtomicBool,
    tx_ready: AtomicBool,
    overflowed: AtomicBool,
    buffers: Mutex<RefCell<UsartBuffers>>,
}

struct LedLine {
    bound: AtomicBool,
    on: AtomicBool,
    toggles: AtomicU32,
}

/// In-memory board holding the units listed in a [`BoardConfig`].
pub struct SimPort {
    millis: AtomicU32,
    buttons: Vec<Option<ButtonLine>>,
    buzzers: Vec<Option<BuzzerLine>>,
    usarts: Vec<Option<UsartLine>>,
    leds: Vec<Option<LedLine>>,
}

fn unit_table<T>(ids: impl Iterator<Item = u8>, make: impl Fn(u8) -> T) -> Vec<Option<T>> {
    let mut table: Vec<Option<T>> = (0..MAX_UNITS).map(|_| None).collect();
    for id in ids {
        if let Some(slot) = table.get_mut(usize::from(id)) {
            *slot = Some(make(id));
        }
    }
    table
}

fn lookup<T>(table: &[Option<T>], id: u8) -> Option<&T> {
    table.get(usize::from(id))?.as_ref()
}

fn bind(bound: Option<&AtomicBool>, kind: UnitKind, id: u8) -> Result<(), PortError> {
    let bound = bound.ok_or(PortError::UnknownUnit { kind, id })?;
    if bound.swap(true, Ordering::AcqRel) {
        return Err(PortError::AlreadyBound { kind, id });
    }
    Ok(())
}

impl SimPort {
    /// Build a board from a validated configuration.
    pub fn new(config: &BoardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_units(config))
    }

    fn with_units(config: &BoardConfig) -> Self {
        let buttons = unit_table(config.buttons.iter().map(|b| b.id), |_| ButtonLine {
            bound: AtomicBool::new(false),
            pressed: AtomicBool::new(false),
        });

        let buzzers = unit_table(config.buzzers.iter().map(|b| b.id), |_| BuzzerLine {
            bound: AtomicBool::new(false),
            note_end: AtomicBool::new(true),
            timer: Mutex::new(RefCell::new(NoteTimer::default())),
        });

        let usarts = unit_table(config.usarts.iter().map(|u| u.id), |id| {
            let cfg = config.usart(id).cloned().unwrap_or_default();
            UsartLine {
                bound: AtomicBool::new(false),
                end_byte: cfg.end_byte,
                overflow: cfg.overflow,
                rx_done: AtomicBool::new(false),
                tx_done: AtomicBool::new(false),
                rx_irq: AtomicBool::new(false),
                tx_irq: AtomicBool::new(false),
                tx_ready: AtomicBool::new(true),
                overflowed: AtomicBool::new(false),
                buffers: Mutex::new(RefCell::new(UsartBuffers::default())),
            }
        });

        let leds = unit_table(config.leds.iter().map(|l| l.id), |_| LedLine {
            bound: AtomicBool::new(false),
            on: AtomicBool::new(false),
            toggles: AtomicU32::new(0),
        });

        Self {
            millis: AtomicU32::new(0),
            buttons,
            buzzers,
            usarts,
            leds,
        }
    }

    /// Whether a machine currently holds the unit.
    pub fn is_bound(&self, kind: UnitKind, id: u8) -> bool {
        let flag = match kind {
            UnitKind::Button => lookup(&self.buttons, id).map(|l| &l.bound),
            UnitKind::Buzzer => lookup(&self.buzzers, id).map(|l| &l.bound),
            UnitKind::Usart => lookup(&self.usarts, id).map(|l| &l.bound),
            UnitKind::Led => lookup(&self.leds, id).map(|l| &l.bound),
        };
        flag.is_some_and(|b| b.load(Ordering::Acquire))
    }

    // ---- system tick ----

    /// Advance the tick by one millisecond and expire due note timers.
    pub fn on_systick(&self) {
        let now = self.millis.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        self.expire_due(now);
    }

    pub fn advance_ms(&self, ms: u32) {
        for _ in 0..ms {
            self.on_systick();
        }
    }

    /// Jump the tick to `ms`; timers due at or before it expire.
    pub fn set_tick(&self, ms: u32) {
        self.millis.store(ms, Ordering::Release);
        self.expire_due(ms);
    }

    fn expire_due(&self, now: u32) {
        for line in self.buzzers.iter().flatten() {
            let expired = critical_section::with(|cs| {
                let mut timer = line.timer.borrow_ref_mut(cs);
                if timer.running && tick_reached(now, timer.deadline) {
                    timer.running = false;
                    true
                } else {
                    false
                }
            });
            if expired {
                line.note_end.store(true, Ordering::Release);
            }
        }
    }

    // ---- button ----

    /// Edge interrupt: record the sampled level.
    pub fn on_button_edge(&self, id: u8, pressed: bool) {
        if let Some(line) = lookup(&self.buttons, id) {
            line.pressed.store(pressed, Ordering::Release);
        }
    }

    pub fn press(&self, id: u8) {
        self.on_button_edge(id, true);
    }

    pub fn release(&self, id: u8) {
        self.on_button_edge(id, false);
    }

    // ---- buzzer ----

    /// Note timer interrupt: expire the running note now.
    pub fn expire_note(&self, id: u8) {
        let Some(line) = lookup(&self.buzzers, id) else {
            return;
        };
        critical_section::with(|cs| line.timer.borrow_ref_mut(cs).running = false);
        line.note_end.store(true, Ordering::Release);
    }

    /// Every note programmed since the board was built, oldest first.
    pub fn programmed_notes(&self, id: u8) -> Vec<ProgrammedNote> {
        lookup(&self.buzzers, id)
            .map(|line| critical_section::with(|cs| line.timer.borrow_ref(cs).notes.clone()))
            .unwrap_or_default()
    }

    /// Frequency the PWM output is driving, `None` while silent.
    pub fn pwm_frequency(&self, id: u8) -> Option<f64> {
        lookup(&self.buzzers, id)
            .and_then(|line| critical_section::with(|cs| line.timer.borrow_ref(cs).pwm_hz))
    }

    pub fn note_timer_running(&self, id: u8) -> bool {
        lookup(&self.buzzers, id)
            .is_some_and(|line| critical_section::with(|cs| line.timer.borrow_ref(cs).running))
    }

    /// Number of `stop` calls received.
    pub fn stop_count(&self, id: u8) -> u32 {
        lookup(&self.buzzers, id)
            .map(|line| critical_section::with(|cs| line.timer.borrow_ref(cs).stops))
            .unwrap_or(0)
    }

    // ---- usart ----

    /// Receive interrupt: store one byte from the data register.
    ///
    /// Returns `false` when the byte was lost, either because the receive
    /// interrupt is disabled or because the overflow policy dropped it.
    pub fn on_rx_byte(&self, id: u8, byte: u8) -> bool {
        let Some(line) = lookup(&self.usarts, id) else {
            return false;
        };
        if !line.rx_irq.load(Ordering::Acquire) {
            return false;
        }

        if byte == line.end_byte {
            critical_section::with(|cs| line.buffers.borrow_ref_mut(cs).i_idx = 0);
            line.rx_done.store(true, Ordering::Release);
            return true;
        }

        critical_section::with(|cs| {
            let mut buf = line.buffers.borrow_ref_mut(cs);
            if buf.i_idx >= INPUT_BUFFER_LEN {
                line.overflowed.store(true, Ordering::Release);
                match line.overflow {
                    OverflowPolicy::Wrap => buf.i_idx = 0,
                    OverflowPolicy::Discard => return false,
                }
            }
            let idx = buf.i_idx;
            buf.input[idx] = byte;
            buf.i_idx += 1;
            true
        })
    }

    /// Feed a byte sequence through the receive interrupt. Returns how many
    /// bytes were kept.
    pub fn deliver(&self, id: u8, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.on_rx_byte(id, b)).count()
    }

    /// Transmit-empty interrupt. Returns `true` if a byte was shifted out.
    pub fn on_tx_ready(&self, id: u8) -> bool {
        let Some(line) = lookup(&self.usarts, id) else {
            return false;
        };
        if !(line.tx_irq.load(Ordering::Acquire) && line.tx_ready.load(Ordering::Acquire)) {
            return false;
        }
        self.write_data(id);
        true
    }

    /// Run the transmit interrupt until it disables itself and return the
    /// bytes that went out on the wire.
    pub fn flush_tx(&self, id: u8) -> Vec<u8> {
        for _ in 0..OUTPUT_BUFFER_LEN {
            if !self.on_tx_ready(id) {
                break;
            }
        }
        self.transmitted(id)
    }

    /// Drain the bytes written to the data register so far.
    pub fn transmitted(&self, id: u8) -> Vec<u8> {
        lookup(&self.usarts, id)
            .map(|line| {
                critical_section::with(|cs| std::mem::take(&mut line.buffers.borrow_ref_mut(cs).wire))
            })
            .unwrap_or_default()
    }

    /// Drive the transmit-empty status bit.
    pub fn set_tx_ready(&self, id: u8, ready: bool) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.tx_ready.store(ready, Ordering::Release);
        }
    }

    pub fn tx_interrupt_enabled(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.tx_irq.load(Ordering::Acquire))
    }

    // ---- led ----

    pub fn toggle_count(&self, id: u8) -> u32 {
        lookup(&self.leds, id).map_or(0, |l| l.toggles.load(Ordering::Acquire))
    }
}

impl Default for SimPort {
    /// The reference board: one unit of each kind, id 0.
    fn default() -> Self {
        Self::with_units(&BoardConfig::default())
    }
}

impl Clock for SimPort {
    fn get_tick(&self) -> u32 {
        self.millis.load(Ordering::Acquire)
    }
}

impl ButtonPort for SimPort {
    fn init_button(&self, id: u8) -> Result<(), PortError> {
        let line = lookup(&self.buttons, id);
        bind(line.map(|l| &l.bound), UnitKind::Button, id)?;
        if let Some(line) = line {
            line.pressed.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn release_button(&self, id: u8) {
        if let Some(line) = lookup(&self.buttons, id) {
            line.bound.store(false, Ordering::Release);
        }
    }

    fn is_pressed(&self, id: u8) -> bool {
        lookup(&self.buttons, id).is_some_and(|l| l.pressed.load(Ordering::Acquire))
    }
}

impl BuzzerPort for SimPort {
    fn init_buzzer(&self, id: u8) -> Result<(), PortError> {
        let line = lookup(&self.buzzers, id);
        bind(line.map(|l| &l.bound), UnitKind::Buzzer, id)?;
        if let Some(line) = line {
            line.note_end.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn release_buzzer(&self, id: u8) {
        if let Some(line) = lookup(&self.buzzers, id) {
            line.bound.store(false, Ordering::Release);
        }
    }

    fn set_note_duration(&self, id: u8, duration_ms: u32) {
        let Some(line) = lookup(&self.buzzers, id) else {
            return;
        };
        let now = self.get_tick();
        line.note_end.store(false, Ordering::Release);
        critical_section::with(|cs| {
            let mut timer = line.timer.borrow_ref_mut(cs);
            timer.running = true;
            timer.armed_at = now;
            timer.deadline = now.wrapping_add(duration_ms);
            timer.pending_duration = duration_ms;
        });
    }

    fn set_note_frequency(&self, id: u8, frequency_hz: f64) {
        let Some(line) = lookup(&self.buzzers, id) else {
            return;
        };
        critical_section::with(|cs| {
            let mut timer = line.timer.borrow_ref_mut(cs);
            timer.pwm_hz = (frequency_hz > 0.0).then_some(frequency_hz);
            let note = ProgrammedNote {
                frequency_hz,
                duration_ms: timer.pending_duration,
                at: timer.armed_at,
            };
            timer.notes.push(note);
        });
    }

    fn get_note_timeout(&self, id: u8) -> bool {
        lookup(&self.buzzers, id).is_some_and(|l| l.note_end.load(Ordering::Acquire))
    }

    fn stop(&self, id: u8) {
        if let Some(line) = lookup(&self.buzzers, id) {
            critical_section::with(|cs| {
                let mut timer = line.timer.borrow_ref_mut(cs);
                timer.running = false;
                timer.pwm_hz = None;
                timer.stops += 1;
            });
        }
    }
}

impl UsartPort for SimPort {
    fn init_usart(&self, id: u8) -> Result<(), PortError> {
        let line = lookup(&self.usarts, id);
        bind(line.map(|l| &l.bound), UnitKind::Usart, id)?;
        if let Some(line) = line {
            line.rx_irq.store(false, Ordering::Release);
            line.tx_irq.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn release_usart(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.rx_irq.store(false, Ordering::Release);
            line.tx_irq.store(false, Ordering::Release);
            line.bound.store(false, Ordering::Release);
        }
    }

    fn rx_done(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.rx_done.load(Ordering::Acquire))
    }

    fn tx_done(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.tx_done.load(Ordering::Acquire))
    }

    fn rx_overflowed(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.overflowed.load(Ordering::Acquire))
    }

    fn tx_ready(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.tx_ready.load(Ordering::Acquire))
    }

    fn get_from_input_buffer(&self, id: u8, out: &mut [u8; INPUT_BUFFER_LEN]) {
        if let Some(line) = lookup(&self.usarts, id) {
            critical_section::with(|cs| out.copy_from_slice(&line.buffers.borrow_ref(cs).input));
        }
    }

    fn copy_to_output_buffer(&self, id: u8, data: &[u8]) {
        let Some(line) = lookup(&self.usarts, id) else {
            return;
        };
        let len = data.len().min(OUTPUT_BUFFER_LEN);
        critical_section::with(|cs| {
            let mut buf = line.buffers.borrow_ref_mut(cs);
            buf.output.fill(EMPTY_BYTE);
            buf.output[..len].copy_from_slice(&data[..len]);
        });
    }

    fn reset_input_buffer(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            critical_section::with(|cs| {
                let mut buf = line.buffers.borrow_ref_mut(cs);
                buf.input.fill(EMPTY_BYTE);
                buf.i_idx = 0;
            });
            line.overflowed.store(false, Ordering::Release);
            line.rx_done.store(false, Ordering::Release);
        }
    }

    fn reset_output_buffer(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            critical_section::with(|cs| {
                let mut buf = line.buffers.borrow_ref_mut(cs);
                buf.output.fill(EMPTY_BYTE);
                buf.o_idx = 0;
            });
            line.tx_done.store(false, Ordering::Release);
        }
    }

    fn write_data(&self, id: u8) {
        let Some(line) = lookup(&self.usarts, id) else {
            return;
        };
        let finished = critical_section::with(|cs| {
            let mut buf = line.buffers.borrow_ref_mut(cs);
            let idx = buf.o_idx;
            let byte = buf.output[idx];

            if byte == EMPTY_BYTE {
                // Nothing left to send and no end byte seen.
                buf.o_idx = 0;
                true
            } else if idx == OUTPUT_BUFFER_LEN - 1 || byte == line.end_byte {
                buf.wire.push(byte);
                buf.o_idx = 0;
                true
            } else {
                buf.wire.push(byte);
                buf.o_idx += 1;
                false
            }
        });

        if finished {
            line.tx_irq.store(false, Ordering::Release);
            line.tx_done.store(true, Ordering::Release);
        }
    }

    fn enable_rx_interrupt(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.rx_irq.store(true, Ordering::Release);
        }
    }

    fn disable_rx_interrupt(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.rx_irq.store(false, Ordering::Release);
        }
    }

    fn enable_tx_interrupt(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.tx_irq.store(true, Ordering::Release);
        }
    }

    fn disable_tx_interrupt(&self, id: u8) {
        if let Some(line) = lookup(&self.usarts, id) {
            line.tx_irq.store(false, Ordering::Release);
        }
    }

    fn rx_interrupt_enabled(&self, id: u8) -> bool {
        lookup(&self.usarts, id).is_some_and(|l| l.rx_irq.load(Ordering::Acquire))
    }
}

impl LedPort for SimPort {
    fn init_led(&self, id: u8) -> Result<(), PortError> {
        let line = lookup(&self.leds, id);
        bind(line.map(|l| &l.bound), UnitKind::Led, id)?;
        if let Some(line) = line {
            line.on.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn release_led(&self, id: u8) {
        if let Some(line) = lookup(&self.leds, id) {
            line.bound.store(false, Ordering::Release);
        }
    }

    fn toggle(&self, id: u8) {
        if let Some(line) = lookup(&self.leds, id) {
            line.on.fetch_xor(true, Ordering::AcqRel);
            line.toggles.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn is_on(&self, id: u8) -> bool {
        lookup(&self.leds, id).is_some_and(|l| l.on.load(Ordering::Acquire))
    }
}
