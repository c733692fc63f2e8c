//! Crate-level error type.

use crate::builder::BuildError;
use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// Errors returned when constructing or configuring a machine.
///
/// Nothing here is raised while stepping: a step either fires a rule or
/// idles.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Playback speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("Melody '{0}' has no notes")]
    EmptyMelody(String),

    #[error("Message of {len} bytes exceeds the {max}-byte output buffer")]
    MessageTooLong { len: usize, max: usize },

    #[error("Message contains the empty byte at index {index}")]
    EmptyByteInMessage { index: usize },

    #[error("Minimum press duration must be non-zero")]
    ZeroPressThreshold,
}
