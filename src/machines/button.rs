//! Debounced push button.
//!
//! Every edge opens a debounce window during which the level is not
//! sampled again. Releasing the button records how long it was held; the
//! value stays available until someone resets it.

use crate::builder::{TableBuilder, TransitionBuilder};
use crate::config::ButtonConfig;
use crate::engine::{Fsm, Machine, StepResult};
use crate::error::FsmError;
use crate::port::{tick_after, ButtonPort};
use crate::state_enum;
use log::debug;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

state_enum! {
    /// Debounce states of a push button.
    pub enum ButtonState {
        Released,
        ReleasedWait,
        Pressed,
        PressedWait,
    }
    idle: [Released]
}

/// Shared view of a button's last press duration.
///
/// Cloning gives another handle to the same value, so a consumer can read
/// and clear the duration while the button machine keeps writing it.
#[derive(Clone, Debug, Default)]
pub struct PressDuration(Arc<AtomicU32>);

impl PressDuration {
    /// Duration of the last completed press, in ms. Zero when cleared.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub(crate) fn set(&self, ms: u32) {
        self.0.store(ms, Ordering::Release);
    }
}

struct ButtonCtx<P> {
    port: P,
    id: u8,
    debounce_ms: u32,
    next_timeout: u32,
    tick_pressed: u32,
    duration: PressDuration,
}

fn is_pressed<P: ButtonPort>(c: &ButtonCtx<P>) -> bool {
    c.port.is_pressed(c.id)
}

fn is_released<P: ButtonPort>(c: &ButtonCtx<P>) -> bool {
    !c.port.is_pressed(c.id)
}

fn debounce_elapsed<P: ButtonPort>(c: &ButtonCtx<P>) -> bool {
    tick_after(c.port.get_tick(), c.next_timeout)
}

fn store_tick_pressed<P: ButtonPort>(c: &mut ButtonCtx<P>) {
    let now = c.port.get_tick();
    c.tick_pressed = now;
    c.next_timeout = now.wrapping_add(c.debounce_ms);
}

fn store_duration<P: ButtonPort>(c: &mut ButtonCtx<P>) {
    let now = c.port.get_tick();
    c.duration.set(now.wrapping_sub(c.tick_pressed));
    c.next_timeout = now.wrapping_add(c.debounce_ms);
}

/// Button debouncer bound to one hardware button.
///
/// # Example
///
/// ```rust
/// use pollfsm::engine::Machine;
/// use pollfsm::machines::{ButtonFsm, ButtonState};
/// use pollfsm::port::sim::SimPort;
/// use std::sync::Arc;
///
/// let port = Arc::new(SimPort::default());
/// let mut button = ButtonFsm::new(Arc::clone(&port), 150, 0)?;
///
/// port.press(0);
/// button.step();
/// port.advance_ms(151);
/// button.step();
/// assert_eq!(button.state(), ButtonState::Pressed);
///
/// port.advance_ms(500);
/// port.release(0);
/// button.step();
/// assert_eq!(button.get_duration(), 651);
/// # Ok::<(), pollfsm::error::FsmError>(())
/// ```
pub struct ButtonFsm<P: ButtonPort + 'static> {
    fsm: Fsm<ButtonState, ButtonCtx<P>>,
    ctx: ButtonCtx<P>,
}

impl<P: ButtonPort + 'static> ButtonFsm<P> {
    /// Bind button `id` and start in `Released`.
    pub fn new(port: P, debounce_ms: u32, id: u8) -> Result<Self, FsmError> {
        let table = TableBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .from(ButtonState::Released)
                    .when(is_pressed::<P>)
                    .to(ButtonState::PressedWait)
                    .then(store_tick_pressed::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(ButtonState::PressedWait)
                    .when(debounce_elapsed::<P>)
                    .to(ButtonState::Pressed),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(ButtonState::Pressed)
                    .when(is_released::<P>)
                    .to(ButtonState::ReleasedWait)
                    .then(store_duration::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(ButtonState::ReleasedWait)
                    .when(debounce_elapsed::<P>)
                    .to(ButtonState::Released),
            )?
            .build()?;

        port.init_button(id)?;
        debug!("button {} bound, debounce {} ms", id, debounce_ms);

        Ok(Self {
            fsm: Fsm::new(table),
            ctx: ButtonCtx {
                port,
                id,
                debounce_ms,
                next_timeout: 0,
                tick_pressed: 0,
                duration: PressDuration::default(),
            },
        })
    }

    pub fn from_config(port: P, config: &ButtonConfig) -> Result<Self, FsmError> {
        Self::new(port, config.debounce_ms, config.id)
    }

    pub fn id(&self) -> u8 {
        self.ctx.id
    }

    pub fn debounce_ms(&self) -> u32 {
        self.ctx.debounce_ms
    }

    /// Duration of the last completed press, in ms.
    pub fn get_duration(&self) -> u32 {
        self.ctx.duration.get()
    }

    pub fn reset_duration(&self) {
        self.ctx.duration.reset();
    }

    /// Handle for consumers that read and clear the press duration.
    pub fn duration_handle(&self) -> PressDuration {
        self.ctx.duration.clone()
    }
}

impl<P: ButtonPort + 'static> Machine for ButtonFsm<P> {
    type State = ButtonState;

    fn step(&mut self) -> StepResult<ButtonState> {
        self.fsm.step(&mut self.ctx)
    }

    fn state(&self) -> ButtonState {
        self.fsm.current_state()
    }

    /// `true` while a press or its debounce windows are in progress.
    fn check_activity(&self) -> bool {
        self.fsm.current_state() != ButtonState::Released
    }
}

impl<P: ButtonPort + 'static> Drop for ButtonFsm<P> {
    fn drop(&mut self) {
        self.ctx.port.release_button(self.ctx.id);
    }
}
