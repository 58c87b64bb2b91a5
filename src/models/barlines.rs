//! Barline handling
//!
//! A measure carries its barlines as a list of located barlines. The common
//! case is a single right barline; multi-staff parts and measures with both a
//! start repeat and an end repeat carry more.

use serde::{Deserialize, Serialize};

/// Barline types and handling
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BarlineType {
    #[default]
    Regular,     // |
    Dotted,
    Dashed,
    Heavy,
    Double,      // ||
    Final,       // |||
    ReverseFinal,
    HeavyHeavy,
    Tick,
    Short,
    Invisible,
    RepeatStart, // |:
    RepeatEnd,   // :|
}

impl BarlineType {
    /// Parse a MusicXML `<bar-style>` value
    pub fn from_bar_style(text: &str) -> Option<Self> {
        match text.trim() {
            "regular" => Some(BarlineType::Regular),
            "dotted" => Some(BarlineType::Dotted),
            "dashed" => Some(BarlineType::Dashed),
            "heavy" => Some(BarlineType::Heavy),
            "light-light" => Some(BarlineType::Double),
            "light-heavy" => Some(BarlineType::Final),
            "heavy-light" => Some(BarlineType::ReverseFinal),
            "heavy-heavy" => Some(BarlineType::HeavyHeavy),
            "tick" => Some(BarlineType::Tick),
            "short" => Some(BarlineType::Short),
            "none" => Some(BarlineType::Invisible),
            _ => None,
        }
    }

    pub fn is_regular(&self) -> bool {
        *self == BarlineType::Regular
    }

    /// Glyph name for rendering
    pub fn glyph(&self) -> &'static str {
        match self {
            BarlineType::Regular => "barlineSingle",
            BarlineType::Dotted => "barlineDotted",
            BarlineType::Dashed => "barlineDashed",
            BarlineType::Heavy => "barlineHeavy",
            BarlineType::Double => "barlineDouble",
            BarlineType::Final => "barlineFinal",
            BarlineType::ReverseFinal => "barlineReverseFinal",
            BarlineType::HeavyHeavy => "barlineHeavyHeavy",
            BarlineType::Tick => "barlineTick",
            BarlineType::Short => "barlineShort",
            BarlineType::Invisible => "",
            BarlineType::RepeatStart => "repeatLeft",
            BarlineType::RepeatEnd => "repeatRight",
        }
    }
}

/// Where in the measure a barline stands
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BarlineLocation {
    Left,
    Middle,
    #[default]
    Right,
}

impl BarlineLocation {
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "left" => Some(BarlineLocation::Left),
            "middle" => Some(BarlineLocation::Middle),
            "right" => Some(BarlineLocation::Right),
            _ => None,
        }
    }
}

/// Barline position and metadata
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barline {
    pub location: BarlineLocation,
    pub barline_type: BarlineType,
    /// Repeat count for end repeats played more than twice
    pub repeat_times: Option<u32>,
}

impl Barline {
    pub fn new(location: BarlineLocation, barline_type: BarlineType) -> Self {
        Self {
            location,
            barline_type,
            repeat_times: None,
        }
    }

    pub fn right(barline_type: BarlineType) -> Self {
        Self::new(BarlineLocation::Right, barline_type)
    }
}

/// All barlines of a measure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Barlines {
    items: Vec<Barline>,
    /// The right barline was turned FINAL by part bookkeeping, not by the document
    #[serde(default)]
    auto_final: bool,
}

impl Barlines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(barline: Barline) -> Self {
        Self {
            items: vec![barline],
            auto_final: false,
        }
    }

    /// Add a barline; a second barline at the same location replaces the first
    pub fn push(&mut self, barline: Barline) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|b| b.location == barline.location)
        {
            *existing = barline;
        } else {
            self.items.push(barline);
        }
        if barline.location == BarlineLocation::Right {
            self.auto_final = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Barline> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn at(&self, location: BarlineLocation) -> Option<&Barline> {
        self.items.iter().find(|b| b.location == location)
    }

    /// Type of the right barline; an absent right barline is regular
    pub fn right_type(&self) -> BarlineType {
        self.at(BarlineLocation::Right)
            .map(|b| b.barline_type)
            .unwrap_or_default()
    }

    /// Turn a regular right barline into an automatic FINAL.
    /// Returns false when the right barline was already non-regular.
    pub(crate) fn mark_final(&mut self) -> bool {
        if !self.right_type().is_regular() {
            return false;
        }
        self.push(Barline::right(BarlineType::Final));
        self.auto_final = true;
        true
    }

    /// Undo an automatic FINAL; explicit barlines are left alone
    pub(crate) fn clear_final(&mut self) -> bool {
        if !self.auto_final {
            return false;
        }
        self.items.retain(|b| b.location != BarlineLocation::Right);
        self.auto_final = false;
        true
    }
}
