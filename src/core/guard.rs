//! Guards and actions attached to transition rules.
//!
//! A guard is a pure predicate over a machine's context; an action is the
//! side effect run when its rule fires. Both are boxed so a table can mix
//! plain functions and closures.

/// Predicate that gates a transition.
///
/// Guards are evaluated in table order on every step until one holds, so
/// they must not mutate anything.
///
/// # Example
///
/// ```rust
/// use pollfsm::core::Guard;
///
/// struct Counter {
///     ticks: u32,
/// }
///
/// let past_ten = Guard::new(|c: &Counter| c.ticks > 10);
///
/// assert!(past_ten.check(&Counter { ticks: 11 }));
/// assert!(!past_ten.check(&Counter { ticks: 3 }));
/// ```
pub struct Guard<C> {
    predicate: Box<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the guard against a context.
    pub fn check(&self, ctx: &C) -> bool {
        (self.predicate)(ctx)
    }
}

/// Side effect executed when a rule fires.
///
/// # Example
///
/// ```rust
/// use pollfsm::core::Action;
///
/// struct Counter {
///     ticks: u32,
/// }
///
/// let bump = Action::new(|c: &mut Counter| c.ticks += 1);
/// let mut counter = Counter { ticks: 0 };
/// bump.run(&mut counter);
/// assert_eq!(counter.ticks, 1);
/// ```
pub struct Action<C> {
    effect: Box<dyn Fn(&mut C) + Send + Sync>,
}

impl<C> Action<C> {
    /// Create an action from a function over the machine context.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        Action {
            effect: Box::new(effect),
        }
    }

    /// Run the action.
    pub fn run(&self, ctx: &mut C) {
        (self.effect)(ctx)
    }
}
