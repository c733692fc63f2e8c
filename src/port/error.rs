//! Hardware port errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of peripheral held in a port's unit table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Button,
    Buzzer,
    Usart,
    Led,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Button => "button",
            Self::Buzzer => "buzzer",
            Self::Usart => "usart",
            Self::Led => "led",
        };
        f.write_str(name)
    }
}

/// Errors raised when binding a machine to a hardware unit.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PortError {
    #[error("No {kind} with id {id} on this board")]
    UnknownUnit { kind: UnitKind, id: u8 },

    #[error("{kind} {id} is already bound to another machine")]
    AlreadyBound { kind: UnitKind, id: u8 },
}
