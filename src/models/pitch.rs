//! Pitch representation
//!
//! A pitch is a diatonic step, a chromatic alteration and an octave, the
//! same decomposition MusicXML's `<pitch>` element uses.

use serde::{Deserialize, Serialize};

/// Diatonic step (letter name)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Parse a MusicXML `<step>` letter
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "C" => Some(Step::C),
            "D" => Some(Step::D),
            "E" => Some(Step::E),
            "F" => Some(Step::F),
            "G" => Some(Step::G),
            "A" => Some(Step::A),
            "B" => Some(Step::B),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }

    /// Semitones above C in the same octave
    pub fn semitones(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }
}

/// Chromatic accidental sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Semitone offset
    pub fn alter(self) -> i8 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    pub fn from_alter(alter: i8) -> Option<Self> {
        match alter {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    /// Parse a MusicXML `<accidental>` value
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "flat-flat" | "double-flat" => Some(Accidental::DoubleFlat),
            "flat" => Some(Accidental::Flat),
            "natural" => Some(Accidental::Natural),
            "sharp" => Some(Accidental::Sharp),
            "double-sharp" | "sharp-sharp" => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    /// Glyph name for rendering
    pub fn glyph(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "accidentalDoubleFlat",
            Accidental::Flat => "accidentalFlat",
            Accidental::Natural => "accidentalNatural",
            Accidental::Sharp => "accidentalSharp",
            Accidental::DoubleSharp => "accidentalDoubleSharp",
        }
    }
}

/// Sounding pitch as written: step, alteration and octave (4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Self { step, alter, octave }
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.step.semitones() + self.alter as i32
    }

    /// Accidental matching the alteration, if it is a standard one
    pub fn accidental(&self) -> Option<Accidental> {
        Accidental::from_alter(self.alter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_numbers() {
        assert_eq!(Pitch::new(Step::C, 0, 4).midi(), 60);
        assert_eq!(Pitch::new(Step::A, 0, 4).midi(), 69);
        assert_eq!(Pitch::new(Step::B, 1, 3).midi(), 60);
        assert_eq!(Pitch::new(Step::C, -1, 4).midi(), 59);
    }

    #[test]
    fn test_accidental_names() {
        let cases = [
            ("flat-flat", Accidental::DoubleFlat),
            ("flat", Accidental::Flat),
            ("natural", Accidental::Natural),
            ("sharp", Accidental::Sharp),
            ("double-sharp", Accidental::DoubleSharp),
        ];
        for (name, expected) in cases {
            assert_eq!(Accidental::from_musicxml(name), Some(expected), "{}", name);
        }
        assert_eq!(Accidental::from_musicxml("quarter-flat"), None);
    }
}
