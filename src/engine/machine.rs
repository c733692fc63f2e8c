//! Dispatcher that advances a machine by one rule per step.

use crate::core::State;
use crate::engine::transition::TransitionTable;
use log::trace;

/// Result of executing a single step
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepResult<S: State> {
    /// A rule fired; `rule` is its index in the table
    Fired { rule: usize, from: S, to: S },

    /// No rule matched; the machine holds its state
    Idle,
}

impl<S: State> StepResult<S> {
    pub fn fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }

    /// Index of the rule that fired.
    pub fn rule(&self) -> Option<usize> {
        match self {
            Self::Fired { rule, .. } => Some(*rule),
            Self::Idle => None,
        }
    }
}

/// Table-driven state machine.
///
/// The machine owns its current state and its rule table. The context `C`
/// carries the fields guards read and actions write; it lives beside the
/// engine in the concrete machine and is lent to every step.
///
/// # Example
///
/// ```rust
/// use pollfsm::builder::{TableBuilder, TransitionBuilder};
/// use pollfsm::engine::{Fsm, StepResult};
/// use pollfsm::state_enum;
///
/// state_enum! {
///     enum Lamp {
///         Off,
///         On,
///     }
///     idle: [Off]
/// }
///
/// struct Switch {
///     closed: bool,
///     toggles: u32,
/// }
///
/// let table = TableBuilder::new()
///     .transition(
///         TransitionBuilder::new()
///             .from(Lamp::Off)
///             .when(|s: &Switch| s.closed)
///             .to(Lamp::On)
///             .then(|s: &mut Switch| s.toggles += 1),
///     )?
///     .transition(
///         TransitionBuilder::new()
///             .from(Lamp::On)
///             .when(|s: &Switch| !s.closed)
///             .to(Lamp::Off),
///     )?
///     .build()?;
///
/// let mut fsm = Fsm::new(table);
/// let mut switch = Switch { closed: false, toggles: 0 };
///
/// assert_eq!(fsm.step(&mut switch), StepResult::Idle);
/// switch.closed = true;
/// assert!(fsm.step(&mut switch).fired());
/// assert_eq!(fsm.current_state(), Lamp::On);
/// assert_eq!(switch.toggles, 1);
/// # Ok::<(), pollfsm::builder::BuildError>(())
/// ```
pub struct Fsm<S: State, C> {
    current: S,
    table: TransitionTable<S, C>,
}

impl<S: State, C> Fsm<S, C> {
    /// Bind a table; the machine starts in the first rule's source state.
    pub fn new(table: TransitionTable<S, C>) -> Self {
        Self {
            current: table.initial(),
            table,
        }
    }

    pub fn current_state(&self) -> S {
        self.current
    }

    /// Force the current state without running any action.
    pub fn set_state(&mut self, state: S) {
        self.current = state;
    }

    pub fn table(&self) -> &TransitionTable<S, C> {
        &self.table
    }

    /// Fire at most one rule.
    ///
    /// Rules are scanned in declaration order; the first one whose source
    /// state matches and whose guard holds runs its action and moves the
    /// machine to its destination. Later rules are not evaluated.
    pub fn step(&mut self, ctx: &mut C) -> StepResult<S> {
        let Some(index) = self.table.find(&self.current, ctx) else {
            return StepResult::Idle;
        };
        let Some(transition) = self.table.get(index) else {
            return StepResult::Idle;
        };

        if let Some(action) = &transition.action {
            action.run(ctx);
        }

        let from = self.current;
        self.current = transition.to;
        trace!("rule {}: {} -> {}", index, from.name(), transition.to.name());

        StepResult::Fired {
            rule: index,
            from,
            to: transition.to,
        }
    }
}

/// Common surface of the concrete machines, for polling loops.
pub trait Machine {
    type State: State;

    /// Advance the machine by one step.
    fn step(&mut self) -> StepResult<Self::State>;

    fn state(&self) -> Self::State;

    /// Whether the machine has work in flight.
    fn check_activity(&self) -> bool;
}
