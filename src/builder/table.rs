//! Builder for constructing transition tables.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::engine::{Transition, TransitionTable};

/// Builder for an ordered rule table.
///
/// Rules keep the order in which they are added; that order is the
/// priority order the engine uses when several rules share a source state.
pub struct TableBuilder<S: State, C> {
    transitions: Vec<Transition<S, C>>,
}

impl<S: State, C> TableBuilder<S, C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Append a rule using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<S, C>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Append a pre-built rule.
    pub fn add_transition(mut self, transition: Transition<S, C>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Build the table. Fails when no rule was added.
    pub fn build(self) -> Result<TransitionTable<S, C>, BuildError> {
        TransitionTable::new(self.transitions)
    }
}

impl<S: State, C> Default for TableBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}
