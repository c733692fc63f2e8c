//! Core types shared by every machine.
//!
//! - State tags via the `State` trait
//! - Guard predicates and actions over a machine's context

mod guard;
mod state;

pub use guard::{Action, Guard};
pub use state::State;
