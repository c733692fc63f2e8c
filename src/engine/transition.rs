//! Transition rules and the ordered table that holds them.

use crate::builder::BuildError;
use crate::core::{Action, Guard, State};

/// A rule moving a machine from one state to another.
///
/// The rule applies when the machine sits in `from` and the guard (if any)
/// holds for the context. A rule without a guard always applies.
pub struct Transition<S: State, C> {
    pub from: S,
    pub to: S,
    pub guard: Option<Guard<C>>,
    pub action: Option<Action<C>>,
}

impl<S: State, C> Transition<S, C> {
    /// Check if this rule can fire from the current state.
    pub fn can_execute(&self, current: &S, ctx: &C) -> bool {
        if *current != self.from {
            return false;
        }

        self.guard.as_ref().is_none_or(|g| g.check(ctx))
    }
}

/// Immutable, ordered list of transition rules.
///
/// Declaration order is priority order: the engine fires the first rule
/// whose source state and guard both match. A table always holds at least
/// one rule; the first rule's source state is the machine's initial state.
pub struct TransitionTable<S: State, C> {
    transitions: Vec<Transition<S, C>>,
}

impl<S: State, C> TransitionTable<S, C> {
    /// Wrap an ordered list of rules.
    pub fn new(transitions: Vec<Transition<S, C>>) -> Result<Self, BuildError> {
        if transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }
        Ok(Self { transitions })
    }

    /// Source state of the first rule.
    pub fn initial(&self) -> S {
        self.transitions[0].from
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Always `false`; kept for parity with `len`.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Transition<S, C>> {
        self.transitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition<S, C>> {
        self.transitions.iter()
    }

    /// Index of the first rule that can fire, if any.
    pub fn find(&self, current: &S, ctx: &C) -> Option<usize> {
        self.transitions
            .iter()
            .position(|t| t.can_execute(current, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Start,
        Middle,
        End,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Start => "Start",
                Self::Middle => "Middle",
                Self::End => "End",
            }
        }
    }

    struct Ctx {
        ready: bool,
    }

    fn rule(from: TestState, to: TestState, guard: Option<Guard<Ctx>>) -> Transition<TestState, Ctx> {
        Transition {
            from,
            to,
            guard,
            action: None,
        }
    }

    #[test]
    fn can_execute_matches_from_state() {
        let transition = rule(TestState::Start, TestState::Middle, None);
        let ctx = Ctx { ready: false };

        assert!(transition.can_execute(&TestState::Start, &ctx));
        assert!(!transition.can_execute(&TestState::Middle, &ctx));
    }

    #[test]
    fn can_execute_respects_guard() {
        let transition = rule(
            TestState::Middle,
            TestState::End,
            Some(Guard::new(|c: &Ctx| c.ready)),
        );

        assert!(transition.can_execute(&TestState::Middle, &Ctx { ready: true }));
        assert!(!transition.can_execute(&TestState::Middle, &Ctx { ready: false }));
    }

    #[test]
    fn empty_table_is_rejected() {
        let result = TransitionTable::<TestState, Ctx>::new(Vec::new());
        assert!(matches!(result, Err(BuildError::NoTransitions)));
    }

    #[test]
    fn initial_state_is_first_source() {
        let table = TransitionTable::new(vec![
            rule(TestState::Middle, TestState::End, None),
            rule(TestState::Start, TestState::Middle, None),
        ])
        .unwrap();

        assert_eq!(table.initial(), TestState::Middle);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn find_returns_first_match_in_order() {
        let table = TransitionTable::new(vec![
            rule(TestState::Start, TestState::End, Some(Guard::new(|c: &Ctx| c.ready))),
            rule(TestState::Start, TestState::Middle, None),
            rule(TestState::Start, TestState::Start, None),
        ])
        .unwrap();

        assert_eq!(table.find(&TestState::Start, &Ctx { ready: true }), Some(0));
        assert_eq!(table.find(&TestState::Start, &Ctx { ready: false }), Some(1));
        assert_eq!(table.find(&TestState::End, &Ctx { ready: true }), None);
    }
}
