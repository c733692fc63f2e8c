//! Pollfsm: cooperative table-driven state machines for small boards
//!
//! A machine is a current state plus an ordered table of rules. Each rule
//! names a source state, a guard, a destination and an optional action.
//! One call to `step` fires at most the first matching rule, so a polling
//! loop can drive many machines without blocking. Interrupt handlers talk
//! to the machines only through the hardware port's flags and buffers.
//!
//! # Core Concepts
//!
//! - **Engine**: [`Fsm`] scans a [`TransitionTable`] in declaration order
//! - **Port**: traits in [`port`] abstract the peripherals; [`port::sim`]
//!   simulates a board for host builds
//! - **Machines**: button debouncer, melody player, USART transceiver and
//!   LED consumers in [`machines`]
//!
//! # Example
//!
//! ```rust
//! use pollfsm::engine::Machine;
//! use pollfsm::machines::{ButtonFsm, LedToggleFsm};
//! use pollfsm::port::sim::SimPort;
//! use std::sync::Arc;
//!
//! let port = Arc::new(SimPort::default());
//! let mut button = ButtonFsm::new(Arc::clone(&port), 150, 0)?;
//! let mut led = LedToggleFsm::new(Arc::clone(&port), button.duration_handle(), 1000, 0)?;
//!
//! port.press(0);
//! for _ in 0..1500 {
//!     button.step();
//!     led.step();
//!     port.on_systick();
//! }
//! port.release(0);
//! for _ in 0..200 {
//!     button.step();
//!     led.step();
//!     port.on_systick();
//! }
//!
//! assert!(led.is_on());
//! assert_eq!(button.get_duration(), 0);
//! # Ok::<(), pollfsm::FsmError>(())
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod machines;
pub mod melody;
pub mod port;

// Re-export commonly used types
pub use config::BoardConfig;
pub use crate::core::{Action, Guard, State};
pub use engine::{Fsm, Machine, StepResult, Transition, TransitionTable};
pub use error::FsmError;
pub use melody::{Melody, Note};
