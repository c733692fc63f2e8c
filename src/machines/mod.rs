//! Concrete machines built on the dispatch engine.
//!
//! Each machine owns its engine and the fields its rules read, binds one
//! hardware unit on construction and releases it when dropped. Step them
//! through the [`Machine`](crate::engine::Machine) trait.

pub mod button;
pub mod buzzer;
pub mod led;
pub mod usart;

pub use button::{ButtonFsm, ButtonState, PressDuration};
pub use buzzer::{scaled_duration, BuzzerFsm, BuzzerState, PlayerAction};
pub use led::{BlinkFsm, LedState, LedToggleFsm};
pub use usart::{UsartFsm, UsartState};
