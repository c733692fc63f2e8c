//! LED machines: toggle on a long button press, and free-running blink.

use crate::builder::{TableBuilder, TransitionBuilder};
use crate::config::LedConfig;
use crate::engine::{Fsm, Machine, StepResult};
use crate::error::FsmError;
use crate::machines::button::PressDuration;
use crate::port::{tick_reached, LedPort};
use crate::state_enum;
use log::debug;

state_enum! {
    /// The LED machines have a single state; all work happens in the
    /// self-transition's action.
    pub enum LedState {
        Idle,
    }
    idle: [Idle]
}

struct ToggleCtx<P> {
    port: P,
    id: u8,
    button: PressDuration,
    min_duration_ms: u32,
}

fn long_press<P: LedPort>(c: &ToggleCtx<P>) -> bool {
    let duration = c.button.get();
    duration != 0 && duration >= c.min_duration_ms
}

fn consume_press<P: LedPort>(c: &mut ToggleCtx<P>) {
    c.button.reset();
    c.port.toggle(c.id);
}

/// Toggles an LED each time the button reports a press of at least
/// `min_duration_ms`. The press is consumed: its duration is reset.
pub struct LedToggleFsm<P: LedPort + 'static> {
    fsm: Fsm<LedState, ToggleCtx<P>>,
    ctx: ToggleCtx<P>,
}

impl<P: LedPort + 'static> LedToggleFsm<P> {
    pub fn new(port: P, button: PressDuration, min_duration_ms: u32, id: u8) -> Result<Self, FsmError> {
        if min_duration_ms == 0 {
            return Err(FsmError::ZeroPressThreshold);
        }

        let table = TableBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .from(LedState::Idle)
                    .when(long_press::<P>)
                    .to(LedState::Idle)
                    .then(consume_press::<P>),
            )?
            .build()?;

        port.init_led(id)?;
        debug!("led {} bound, toggles on presses >= {} ms", id, min_duration_ms);

        Ok(Self {
            fsm: Fsm::new(table),
            ctx: ToggleCtx {
                port,
                id,
                button,
                min_duration_ms,
            },
        })
    }

    pub fn from_config(port: P, button: PressDuration, config: &LedConfig) -> Result<Self, FsmError> {
        Self::new(port, button, config.min_press_ms, config.id)
    }

    pub fn min_duration_ms(&self) -> u32 {
        self.ctx.min_duration_ms
    }

    pub fn is_on(&self) -> bool {
        self.ctx.port.is_on(self.ctx.id)
    }
}

impl<P: LedPort + 'static> Machine for LedToggleFsm<P> {
    type State = LedState;

    fn step(&mut self) -> StepResult<LedState> {
        self.fsm.step(&mut self.ctx)
    }

    fn state(&self) -> LedState {
        self.fsm.current_state()
    }

    /// `true` when a qualifying press is waiting to be consumed.
    fn check_activity(&self) -> bool {
        long_press(&self.ctx)
    }
}

impl<P: LedPort + 'static> Drop for LedToggleFsm<P> {
    fn drop(&mut self) {
        self.ctx.port.release_led(self.ctx.id);
    }
}

struct BlinkCtx<P> {
    port: P,
    id: u8,
    period_ms: u32,
    last_toggle: u32,
}

fn half_period_elapsed<P: LedPort>(c: &BlinkCtx<P>) -> bool {
    tick_reached(c.port.get_tick(), c.last_toggle.wrapping_add(c.period_ms / 2))
}

fn blink<P: LedPort>(c: &mut BlinkCtx<P>) {
    c.last_toggle = c.port.get_tick();
    c.port.toggle(c.id);
}

/// Blinks an LED with a fixed period, toggling every half period.
pub struct BlinkFsm<P: LedPort + 'static> {
    fsm: Fsm<LedState, BlinkCtx<P>>,
    ctx: BlinkCtx<P>,
}

impl<P: LedPort + 'static> BlinkFsm<P> {
    /// Bind LED `id`. The first toggle happens half a period after now.
    pub fn new(port: P, period_ms: u32, id: u8) -> Result<Self, FsmError> {
        let table = TableBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .from(LedState::Idle)
                    .when(half_period_elapsed::<P>)
                    .to(LedState::Idle)
                    .then(blink::<P>),
            )?
            .build()?;

        port.init_led(id)?;
        debug!("led {} bound, blink period {} ms", id, period_ms);
        let last_toggle = port.get_tick();

        Ok(Self {
            fsm: Fsm::new(table),
            ctx: BlinkCtx {
                port,
                id,
                period_ms,
                last_toggle,
            },
        })
    }

    pub fn from_config(port: P, config: &LedConfig) -> Result<Self, FsmError> {
        Self::new(port, config.blink_period_ms, config.id)
    }

    pub fn period_ms(&self) -> u32 {
        self.ctx.period_ms
    }

    pub fn is_on(&self) -> bool {
        self.ctx.port.is_on(self.ctx.id)
    }
}

impl<P: LedPort + 'static> Machine for BlinkFsm<P> {
    type State = LedState;

    fn step(&mut self) -> StepResult<LedState> {
        self.fsm.step(&mut self.ctx)
    }

    fn state(&self) -> LedState {
        self.fsm.current_state()
    }

    /// Always `false`; the next toggle is driven by the tick alone.
    fn check_activity(&self) -> bool {
        false
    }
}

impl<P: LedPort + 'static> Drop for BlinkFsm<P> {
    fn drop(&mut self) {
        self.ctx.port.release_led(self.ctx.id);
    }
}
