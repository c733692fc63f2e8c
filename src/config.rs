//! Board configuration.
//!
//! Lists the hardware units present on the board and the parameters their
//! machines start with. Every field has a default reproducing the
//! reference board, so a partial JSON document is enough:
//!
//! ```rust
//! use pollfsm::config::{BoardConfig, OverflowPolicy};
//!
//! let config = BoardConfig::from_json(
//!     r#"{ "usarts": [{ "id": 0, "end_byte": 13, "overflow": "discard" }] }"#,
//! )?;
//!
//! assert_eq!(config.usarts[0].end_byte, b'\r');
//! assert_eq!(config.usarts[0].overflow, OverflowPolicy::Discard);
//! assert_eq!(config.buttons[0].debounce_ms, 150);
//! # Ok::<(), pollfsm::config::ConfigError>(())
//! ```

use crate::port::{UnitKind, DEFAULT_END_BYTE, EMPTY_BYTE, MAX_UNITS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors found while loading or validating a board configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{kind} id {id} is out of range (max {max})")]
    UnitOutOfRange { kind: UnitKind, id: u8, max: usize },

    #[error("{kind} id {id} is declared more than once")]
    DuplicateUnit { kind: UnitKind, id: u8 },

    #[error("Buzzer {id}: playback speed must be positive and finite, got {speed}")]
    InvalidSpeed { id: u8, speed: f64 },

    #[error("Usart {id}: end byte cannot be the empty-buffer filler")]
    EndByteIsEmpty { id: u8 },

    #[error("Led {id}: minimum press duration must be non-zero")]
    ZeroPressThreshold { id: u8 },
}

/// What a USART does with bytes that arrive once its input buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Restart at the first slot, overwriting earlier bytes.
    #[default]
    Wrap,

    /// Keep the first bytes and drop the rest of the message.
    Discard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub id: u8,
    /// Window absorbing contact bounce after each edge.
    pub debounce_ms: u32,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            id: 0,
            debounce_ms: 150,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuzzerConfig {
    pub id: u8,
    /// Initial playback speed; note durations are divided by it.
    pub speed: f64,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self { id: 0, speed: 1.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsartConfig {
    pub id: u8,
    /// Byte that terminates a message in both directions.
    pub end_byte: u8,
    pub overflow: OverflowPolicy,
}

impl Default for UsartConfig {
    fn default() -> Self {
        Self {
            id: 0,
            end_byte: DEFAULT_END_BYTE,
            overflow: OverflowPolicy::Wrap,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    pub id: u8,
    /// Shortest button press that toggles the LED.
    pub min_press_ms: u32,
    /// Full on/off cycle when blinking.
    pub blink_period_ms: u32,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            id: 0,
            min_press_ms: 1000,
            blink_period_ms: 1000,
        }
    }
}

/// Units present on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub buttons: Vec<ButtonConfig>,
    pub buzzers: Vec<BuzzerConfig>,
    pub usarts: Vec<UsartConfig>,
    pub leds: Vec<LedConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            buttons: vec![ButtonConfig::default()],
            buzzers: vec![BuzzerConfig::default()],
            usarts: vec![UsartConfig::default()],
            leds: vec![LedConfig::default()],
        }
    }
}

impl BoardConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ids and per-unit parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ids(UnitKind::Button, self.buttons.iter().map(|b| b.id))?;
        check_ids(UnitKind::Buzzer, self.buzzers.iter().map(|b| b.id))?;
        check_ids(UnitKind::Usart, self.usarts.iter().map(|u| u.id))?;
        check_ids(UnitKind::Led, self.leds.iter().map(|l| l.id))?;

        for buzzer in &self.buzzers {
            if !(buzzer.speed.is_finite() && buzzer.speed > 0.0) {
                return Err(ConfigError::InvalidSpeed {
                    id: buzzer.id,
                    speed: buzzer.speed,
                });
            }
        }

        if let Some(usart) = self.usarts.iter().find(|u| u.end_byte == EMPTY_BYTE) {
            return Err(ConfigError::EndByteIsEmpty { id: usart.id });
        }

        if let Some(led) = self.leds.iter().find(|l| l.min_press_ms == 0) {
            return Err(ConfigError::ZeroPressThreshold { id: led.id });
        }

        Ok(())
    }

    pub fn button(&self, id: u8) -> Option<&ButtonConfig> {
        self.buttons.iter().find(|b| b.id == id)
    }

    pub fn buzzer(&self, id: u8) -> Option<&BuzzerConfig> {
        self.buzzers.iter().find(|b| b.id == id)
    }

    pub fn usart(&self, id: u8) -> Option<&UsartConfig> {
        self.usarts.iter().find(|u| u.id == id)
    }

    pub fn led(&self, id: u8) -> Option<&LedConfig> {
        self.leds.iter().find(|l| l.id == id)
    }
}

fn check_ids(kind: UnitKind, ids: impl Iterator<Item = u8>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if usize::from(id) >= MAX_UNITS {
            return Err(ConfigError::UnitOutOfRange {
                kind,
                id,
                max: MAX_UNITS - 1,
            });
        }
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateUnit { kind, id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_board() {
        let config = BoardConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.buttons[0].debounce_ms, 150);
        assert_eq!(config.buzzers[0].speed, 1.0);
        assert_eq!(config.usarts[0].end_byte, 0x0A);
        assert_eq!(config.usarts[0].overflow, OverflowPolicy::Wrap);
        assert_eq!(config.leds[0].min_press_ms, 1000);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = BoardConfig::from_json("{}").unwrap();
        assert_eq!(config, BoardConfig::default());
    }

    #[test]
    fn partial_unit_fills_missing_fields() {
        let config = BoardConfig::from_json(r#"{ "buttons": [{ "id": 2 }] }"#).unwrap();

        assert_eq!(config.buttons.len(), 1);
        assert_eq!(config.button(2).map(|b| b.debounce_ms), Some(150));
        assert!(config.button(0).is_none());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let mut config = BoardConfig::default();
        config.buzzers[0].speed = 2.5;

        let json = config.to_json().unwrap();
        assert_eq!(BoardConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn rejects_out_of_range_id() {
        let result = BoardConfig::from_json(r#"{ "leds": [{ "id": 4 }] }"#);
        assert!(matches!(
            result,
            Err(ConfigError::UnitOutOfRange {
                kind: UnitKind::Led,
                id: 4,
                ..
            })
        ));
    }

    #[test]
    fn rejects_duplicate_id() {
        let result = BoardConfig::from_json(r#"{ "buttons": [{ "id": 1 }, { "id": 1 }] }"#);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateUnit {
                kind: UnitKind::Button,
                id: 1
            })
        ));
    }

    #[test]
    fn rejects_non_positive_speed() {
        let result = BoardConfig::from_json(r#"{ "buzzers": [{ "id": 0, "speed": 0.0 }] }"#);
        assert!(matches!(result, Err(ConfigError::InvalidSpeed { id: 0, .. })));

        let result = BoardConfig::from_json(r#"{ "buzzers": [{ "id": 0, "speed": -1.5 }] }"#);
        assert!(matches!(result, Err(ConfigError::InvalidSpeed { .. })));
    }

    #[test]
    fn rejects_empty_end_byte() {
        let result = BoardConfig::from_json(r#"{ "usarts": [{ "id": 0, "end_byte": 0 }] }"#);
        assert!(matches!(result, Err(ConfigError::EndByteIsEmpty { id: 0 })));
    }

    #[test]
    fn rejects_zero_press_threshold() {
        let result = BoardConfig::from_json(r#"{ "leds": [{ "id": 0, "min_press_ms": 0 }] }"#);
        assert!(matches!(result, Err(ConfigError::ZeroPressThreshold { id: 0 })));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let result = BoardConfig::from_json("{ buttons: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
