//! Builder API for declaring rule tables.
//!
//! Concrete machines describe their behaviour as an ordered list of rules
//! built with [`TransitionBuilder`] and collected by [`TableBuilder`]. The
//! [`state_enum!`](crate::state_enum) macro declares the state tags.

pub mod error;
pub mod macros;
pub mod table;
pub mod transition;

pub use error::BuildError;
pub use table::TableBuilder;
pub use transition::TransitionBuilder;
