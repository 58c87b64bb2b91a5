//! Key signatures and the key service used when spelling accidentals

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::errors::ModelError;
use super::pitch::{Pitch, Step};

/// Order in which sharps are added to a key signature
const SHARP_ORDER: [Step; 7] = [Step::F, Step::C, Step::G, Step::D, Step::A, Step::E, Step::B];

/// Order in which flats are added to a key signature
const FLAT_ORDER: [Step; 7] = [Step::B, Step::E, Step::A, Step::D, Step::G, Step::C, Step::F];

/// Musical mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Ionian,
    Locrian,
    None,
}

impl Mode {
    /// Parse a MusicXML `<mode>` value
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "major" => Some(Mode::Major),
            "minor" => Some(Mode::Minor),
            "dorian" => Some(Mode::Dorian),
            "phrygian" => Some(Mode::Phrygian),
            "lydian" => Some(Mode::Lydian),
            "mixolydian" => Some(Mode::Mixolydian),
            "aeolian" => Some(Mode::Aeolian),
            "ionian" => Some(Mode::Ionian),
            "locrian" => Some(Mode::Locrian),
            "none" => Some(Mode::None),
            _ => None,
        }
    }
}

/// Answers the questions accidental spelling needs about a key
pub trait KeyService {
    /// True when `pitch` needs an accidental against this key
    fn has_accidental(&self, pitch: &Pitch) -> bool;

    /// Steps the key signature alters
    fn altered_steps(&self) -> BTreeSet<Step>;
}

/// Traditional key signature: position on the circle of fifths plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "KeyFields")]
pub struct Key {
    fifths: i8,
    mode: Mode,
}

/// Unchecked serialized form of [`Key`]
#[derive(Deserialize)]
struct KeyFields {
    fifths: i32,
    mode: Mode,
}

impl TryFrom<KeyFields> for Key {
    type Error = ModelError;

    fn try_from(fields: KeyFields) -> Result<Self, Self::Error> {
        Key::new(fields.fifths, fields.mode)
    }
}

impl Key {
    pub fn new(fifths: i32, mode: Mode) -> Result<Self, ModelError> {
        if !(-7..=7).contains(&fifths) {
            return Err(ModelError::InvalidKey(fifths));
        }
        Ok(Self {
            fifths: fifths as i8,
            mode,
        })
    }

    /// Positive for sharps, negative for flats
    pub fn fifths(&self) -> i8 {
        self.fifths
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_sharp(&self) -> bool {
        self.fifths > 0
    }

    pub fn is_flat(&self) -> bool {
        self.fifths < 0
    }

    /// Alteration the key signature applies to `step`
    pub fn alter_for(&self, step: Step) -> i8 {
        let count = self.fifths.unsigned_abs() as usize;
        if self.is_sharp() && SHARP_ORDER[..count].contains(&step) {
            1
        } else if self.is_flat() && FLAT_ORDER[..count].contains(&step) {
            -1
        } else {
            0
        }
    }
}

impl KeyService for Key {
    fn has_accidental(&self, pitch: &Pitch) -> bool {
        pitch.alter != self.alter_for(pitch.step)
    }

    fn altered_steps(&self) -> BTreeSet<Step> {
        let count = self.fifths.unsigned_abs() as usize;
        let order = if self.is_sharp() { &SHARP_ORDER } else { &FLAT_ORDER };
        order[..count].iter().copied().collect()
    }
}
