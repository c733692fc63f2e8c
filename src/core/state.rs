//! Core State trait for machine states.
//!
//! Every concrete machine tags its position with a small enum that
//! implements this trait. Methods are pure and cheap to call from a
//! polling loop.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Copy`: States are small tags copied in and out of the engine
/// - `PartialEq`: The engine matches rules by comparing states
/// - `Debug`: States must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: States can be reported over a link
///
/// # Example
///
/// ```rust
/// use pollfsm::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Closed,
///     Opening,
///     Open,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Closed => "Closed",
///             Self::Opening => "Opening",
///             Self::Open => "Open",
///         }
///     }
///
///     fn is_idle(&self) -> bool {
///         matches!(self, Self::Closed)
///     }
/// }
///
/// assert!(Door::Closed.is_idle());
/// assert_eq!(Door::Opening.name(), "Opening");
/// ```
pub trait State:
    Copy + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a resting state.
    ///
    /// A machine sitting in an idle state has nothing in flight, so the
    /// caller may lower its polling rate.
    ///
    /// Default implementation returns `false`.
    fn is_idle(&self) -> bool {
        false
    }
}
