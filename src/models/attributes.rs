//! Measure attributes: time signature, clef and transposition

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

use super::duration::{ticks_of, Ticks};

/// How a time signature is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeSymbol {
    #[default]
    Normal,
    Common,
    Cut,
}

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Number of beats per measure
    pub beats: u32,
    /// Beat unit (2, 4, 8, 16, etc.)
    pub beat_type: u32,
    pub symbol: TimeSymbol,
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self {
            beats,
            beat_type,
            symbol: TimeSymbol::Normal,
        }
    }

    /// Nominal measure length in whole notes
    pub fn measure_length(&self) -> Rational64 {
        Rational64::new(self.beats as i64, self.beat_type.max(1) as i64)
    }

    /// Nominal measure length in ticks
    pub fn measure_ticks(&self) -> Ticks {
        ticks_of(self.measure_length())
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Clef sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClefSign {
    G,
    F,
    C,
    Percussion,
    Tab,
    Jianpu,
    None,
}

impl ClefSign {
    /// Parse a MusicXML `<sign>` value
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "G" => Some(ClefSign::G),
            "F" => Some(ClefSign::F),
            "C" => Some(ClefSign::C),
            "percussion" => Some(ClefSign::Percussion),
            "TAB" => Some(ClefSign::Tab),
            "jianpu" => Some(ClefSign::Jianpu),
            "none" => Some(ClefSign::None),
            _ => None,
        }
    }

    /// Staff line the sign sits on when none is given
    pub fn default_line(self) -> u8 {
        match self {
            ClefSign::G => 2,
            ClefSign::F => 4,
            ClefSign::C => 3,
            ClefSign::Tab => 5,
            _ => 3,
        }
    }
}

/// Clef: sign, staff line and octave transposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clef {
    pub sign: ClefSign,
    pub line: u8,
    pub octave_change: i8,
}

impl Clef {
    pub fn new(sign: ClefSign, line: u8, octave_change: i8) -> Self {
        Self {
            sign,
            line,
            octave_change,
        }
    }

    pub fn treble() -> Self {
        Self::new(ClefSign::G, 2, 0)
    }

    pub fn bass() -> Self {
        Self::new(ClefSign::F, 4, 0)
    }

    pub fn alto() -> Self {
        Self::new(ClefSign::C, 3, 0)
    }

    pub fn tenor() -> Self {
        Self::new(ClefSign::C, 4, 0)
    }

    pub fn percussion() -> Self {
        Self::new(ClefSign::Percussion, 3, 0)
    }

    /// Glyph name for rendering
    pub fn glyph(&self) -> &'static str {
        match (self.sign, self.octave_change) {
            (ClefSign::G, -1) => "gClef8vb",
            (ClefSign::G, 1) => "gClef8va",
            (ClefSign::G, _) => "gClef",
            (ClefSign::F, -1) => "fClef8vb",
            (ClefSign::F, _) => "fClef",
            (ClefSign::C, _) => "cClef",
            (ClefSign::Percussion, _) => "unpitchedPercussionClef1",
            (ClefSign::Tab, _) => "6stringTabClef",
            (ClefSign::Jianpu, _) | (ClefSign::None, _) => "",
        }
    }
}

impl Default for Clef {
    fn default() -> Self {
        Self::treble()
    }
}

/// Written-to-sounding transposition of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Transposition {
    pub diatonic: i32,
    pub chromatic: i32,
    pub octave_change: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::duration::TICKS_PER_WHOLE;

    #[test]
    fn test_measure_length() {
        assert_eq!(TimeSignature::new(3, 4).measure_length(), Rational64::new(3, 4));
        assert_eq!(TimeSignature::new(6, 8).measure_ticks(), TICKS_PER_WHOLE * 3 / 4);
    }

    #[test]
    fn test_clef_signs() {
        assert_eq!(ClefSign::from_musicxml("G"), Some(ClefSign::G));
        assert_eq!(ClefSign::from_musicxml("percussion"), Some(ClefSign::Percussion));
        assert_eq!(ClefSign::from_musicxml("X"), None);
        assert_eq!(Clef::default(), Clef::treble());
    }
}
