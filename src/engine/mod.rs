//! Dispatch engine.
//!
//! A machine is a current state plus an immutable, ordered table of
//! `(from, guard, to, action)` rules. Each call to [`Fsm::step`] fires at
//! most one rule: the first, in declaration order, whose source state
//! matches and whose guard holds. When nothing matches the machine simply
//! holds its state.
//!
//! Steps never block; the caller decides how often to poll.

mod machine;
mod transition;

pub use machine::{Fsm, Machine, StepResult};
pub use transition::{Transition, TransitionTable};
