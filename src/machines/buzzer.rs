//! Melody player on a PWM buzzer.
//!
//! The player walks a borrowed [`Melody`] one note at a time. Each note is
//! programmed into the buzzer's note timer; when the timer expires the
//! output is silenced and the next rule decides whether to pause, stop,
//! finish or play the following note.

use crate::builder::{TableBuilder, TransitionBuilder};
use crate::config::BuzzerConfig;
use crate::engine::{Fsm, Machine, StepResult};
use crate::error::FsmError;
use crate::melody::Melody;
use crate::port::BuzzerPort;
use crate::state_enum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

state_enum! {
    /// Playback states of a melody player.
    pub enum BuzzerState {
        WaitStart,
        PlayNote,
        PauseNote,
        WaitNote,
        WaitMelody,
    }
    idle: [WaitStart, WaitMelody]
}

/// Command requested by the user of the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    #[default]
    Stop,
    Play,
    Pause,
}

/// Hardware duration for a nominal note length played at `speed`.
///
/// Rounds to the nearest millisecond.
pub fn scaled_duration(nominal_ms: u32, speed: f64) -> u32 {
    (f64::from(nominal_ms) / speed).round() as u32
}

struct BuzzerCtx<'m, P> {
    port: P,
    id: u8,
    melody: Option<&'m Melody>,
    note_index: usize,
    action: PlayerAction,
    speed: f64,
}

impl<P: BuzzerPort> BuzzerCtx<'_, P> {
    fn start_note(&mut self, index: usize) {
        let Some(note) = self.melody.and_then(|m| m.note(index)) else {
            return;
        };
        self.port
            .set_note_duration(self.id, scaled_duration(note.duration_ms, self.speed));
        self.port.set_note_frequency(self.id, note.frequency_hz);
    }
}

fn melody_start<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.melody.is_some() && c.action == PlayerAction::Play
}

fn note_end<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.port.get_note_timeout(c.id)
}

fn pause_requested<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.action == PlayerAction::Pause
}

fn stop_requested<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.action == PlayerAction::Stop
}

fn play_requested<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.action == PlayerAction::Play
}

fn melody_finished<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.melody.is_none_or(|m| c.note_index >= m.len())
}

fn next_note_pending<P: BuzzerPort>(c: &BuzzerCtx<'_, P>) -> bool {
    c.melody.is_some_and(|m| c.note_index <= m.len()) && c.action == PlayerAction::Play
}

fn start_melody<P: BuzzerPort>(c: &mut BuzzerCtx<'_, P>) {
    c.start_note(0);
    c.note_index = 1;
}

fn silence<P: BuzzerPort>(c: &mut BuzzerCtx<'_, P>) {
    c.port.stop(c.id);
}

fn stop_player<P: BuzzerPort>(c: &mut BuzzerCtx<'_, P>) {
    c.port.stop(c.id);
    c.note_index = 0;
    c.action = PlayerAction::Stop;
}

fn end_melody<P: BuzzerPort>(c: &mut BuzzerCtx<'_, P>) {
    c.port.stop(c.id);
    c.note_index = 0;
    c.action = PlayerAction::Stop;
}

fn play_next_note<P: BuzzerPort>(c: &mut BuzzerCtx<'_, P>) {
    c.start_note(c.note_index);
    c.note_index += 1;
}

/// Buzzer melody player bound to one hardware buzzer.
///
/// The melody is borrowed for `'m`; the caller keeps ownership and may
/// share one melody between players.
///
/// # Example
///
/// ```rust
/// use pollfsm::engine::Machine;
/// use pollfsm::machines::{BuzzerFsm, BuzzerState, PlayerAction};
/// use pollfsm::melody::Melody;
/// use pollfsm::port::sim::SimPort;
/// use std::sync::Arc;
///
/// let port = Arc::new(SimPort::default());
/// let melody = Melody::from_pairs("beep", &[(1000.0, 100)])?;
///
/// let mut buzzer = BuzzerFsm::new(Arc::clone(&port), 0)?;
/// buzzer.set_melody(&melody);
/// buzzer.set_action(PlayerAction::Play);
///
/// buzzer.step();
/// assert_eq!(buzzer.state(), BuzzerState::WaitNote);
///
/// port.advance_ms(100);
/// buzzer.step();
/// buzzer.step();
/// assert_eq!(buzzer.state(), BuzzerState::WaitMelody);
/// assert!(!buzzer.check_activity());
/// # Ok::<(), pollfsm::error::FsmError>(())
/// ```
pub struct BuzzerFsm<'m, P: BuzzerPort + 'static> {
    fsm: Fsm<BuzzerState, BuzzerCtx<'m, P>>,
    ctx: BuzzerCtx<'m, P>,
}

impl<'m, P: BuzzerPort + 'static> BuzzerFsm<'m, P> {
    /// Bind buzzer `id`. The player starts stopped, at speed 1.0, with no
    /// melody.
    pub fn new(port: P, id: u8) -> Result<Self, FsmError> {
        // Rule order decides what happens once the last note ends: an
        // explicit pause or stop wins over finishing the melody.
        let table = TableBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::WaitStart)
                    .when(melody_start::<P>)
                    .to(BuzzerState::WaitNote)
                    .then(start_melody::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::WaitNote)
                    .when(note_end::<P>)
                    .to(BuzzerState::PlayNote)
                    .then(silence::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::PlayNote)
                    .when(pause_requested::<P>)
                    .to(BuzzerState::PauseNote)
                    .then(silence::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::PlayNote)
                    .when(stop_requested::<P>)
                    .to(BuzzerState::WaitStart)
                    .then(stop_player::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::PlayNote)
                    .when(melody_finished::<P>)
                    .to(BuzzerState::WaitMelody)
                    .then(end_melody::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::PlayNote)
                    .when(next_note_pending::<P>)
                    .to(BuzzerState::WaitNote)
                    .then(play_next_note::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::WaitMelody)
                    .when(melody_start::<P>)
                    .to(BuzzerState::WaitNote)
                    .then(start_melody::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(BuzzerState::PauseNote)
                    .when(play_requested::<P>)
                    .to(BuzzerState::PlayNote),
            )?
            .build()?;

        port.init_buzzer(id)?;
        debug!("buzzer {} bound", id);

        Ok(Self {
            fsm: Fsm::new(table),
            ctx: BuzzerCtx {
                port,
                id,
                melody: None,
                note_index: 0,
                action: PlayerAction::Stop,
                speed: 1.0,
            },
        })
    }

    pub fn from_config(port: P, config: &BuzzerConfig) -> Result<Self, FsmError> {
        let mut buzzer = Self::new(port, config.id)?;
        buzzer.set_speed(config.speed)?;
        Ok(buzzer)
    }

    pub fn id(&self) -> u8 {
        self.ctx.id
    }

    /// Select the melody to play. Takes effect on the next start.
    pub fn set_melody(&mut self, melody: &'m Melody) {
        debug!("buzzer {}: melody '{}' ({} notes)", self.ctx.id, melody.name(), melody.len());
        self.ctx.melody = Some(melody);
    }

    pub fn melody(&self) -> Option<&'m Melody> {
        self.ctx.melody
    }

    /// Set the playback speed. Note durations are divided by it.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), FsmError> {
        if !(speed.is_finite() && speed > 0.0) {
            warn!("buzzer {}: rejected speed {}", self.ctx.id, speed);
            return Err(FsmError::InvalidSpeed(speed));
        }
        self.ctx.speed = speed;
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.ctx.speed
    }

    /// Request play, pause or stop. Stopping rewinds to the first note.
    pub fn set_action(&mut self, action: PlayerAction) {
        self.ctx.action = action;
        if action == PlayerAction::Stop {
            self.ctx.note_index = 0;
        }
    }

    pub fn get_action(&self) -> PlayerAction {
        self.ctx.action
    }

    /// Index of the next note to program.
    pub fn note_index(&self) -> usize {
        self.ctx.note_index
    }
}

impl<P: BuzzerPort + 'static> Machine for BuzzerFsm<'_, P> {
    type State = BuzzerState;

    fn step(&mut self) -> StepResult<BuzzerState> {
        self.fsm.step(&mut self.ctx)
    }

    fn state(&self) -> BuzzerState {
        self.fsm.current_state()
    }

    /// `true` while the player is asked to play.
    fn check_activity(&self) -> bool {
        self.ctx.action == PlayerAction::Play
    }
}

impl<P: BuzzerPort + 'static> Drop for BuzzerFsm<'_, P> {
    fn drop(&mut self) {
        self.ctx.port.stop(self.ctx.id);
        self.ctx.port.release_buzzer(self.ctx.id);
    }
}
