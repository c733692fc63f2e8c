//! Melodies played by the buzzer machine.

use crate::error::FsmError;
use serde::{Deserialize, Serialize};

/// One note: a PWM frequency held for a nominal duration.
///
/// A frequency of zero is a rest.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub frequency_hz: f64,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(frequency_hz: f64, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    pub const fn rest(duration_ms: u32) -> Self {
        Self::new(0.0, duration_ms)
    }
}

#[derive(Deserialize)]
struct RawMelody {
    name: String,
    notes: Vec<Note>,
}

/// Ordered, non-empty sequence of notes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMelody")]
pub struct Melody {
    name: String,
    notes: Vec<Note>,
}

impl TryFrom<RawMelody> for Melody {
    type Error = FsmError;

    fn try_from(raw: RawMelody) -> Result<Self, Self::Error> {
        Melody::new(raw.name, raw.notes)
    }
}

impl Melody {
    pub fn new(name: impl Into<String>, notes: Vec<Note>) -> Result<Self, FsmError> {
        let name = name.into();
        if notes.is_empty() {
            return Err(FsmError::EmptyMelody(name));
        }
        Ok(Self { name, notes })
    }

    /// Build from `(frequency_hz, duration_ms)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(f64, u32)]) -> Result<Self, FsmError> {
        let notes = pairs.iter().map(|&(f, d)| Note::new(f, d)).collect();
        Self::new(name, notes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Always `false`: an empty melody cannot be built.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Playing time at `speed`, with each note rounded as the buzzer does.
    pub fn total_duration_ms(&self, speed: f64) -> u64 {
        self.notes
            .iter()
            .map(|n| u64::from(crate::machines::buzzer::scaled_duration(n.duration_ms, speed)))
            .sum()
    }

    /// C major scale, one quarter second per note.
    pub fn c_major_scale() -> Self {
        const SCALE: [f64; 8] = [261.63, 293.66, 329.63, 349.23, 392.00, 440.00, 493.88, 523.25];
        Self {
            name: "c_major_scale".to_string(),
            notes: SCALE.iter().map(|&f| Note::new(f, 250)).collect(),
        }
    }

    /// Two alternating tones with short rests, repeated three times.
    pub fn alarm() -> Self {
        let beat = [Note::new(880.0, 200), Note::rest(50), Note::new(660.0, 200), Note::rest(50)];
        Self {
            name: "alarm".to_string(),
            notes: beat.iter().copied().cycle().take(beat.len() * 3).collect(),
        }
    }
}
