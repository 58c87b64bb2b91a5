//! Measure: a timeline segment owning notes plus the attributes in force
//!
//! Appending repacks every event's start offset. Offsets are prefix sums of
//! durations in append order; a chord-flagged note shares the onset of the
//! note before it. [`Packing::PerVoice`] keeps one running sum per voice
//! instead. The total is never checked against the time signature.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::attributes::{Clef, TimeSignature, Transposition};
use super::barlines::Barlines;
use super::duration::{Ticks, TICKS_PER_WHOLE};
use super::errors::ModelError;
use super::key::Key;
use super::marks::Mark;
use super::note::{GroupKind, MeasureEvent, Note, NoteGroup};

/// How start offsets are recomputed on append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Packing {
    /// One running sum over every event in append order
    #[default]
    Sequential,
    /// One running sum per voice; voices overlay from the measure start
    PerVoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number as written (may be non-numeric, e.g. "12a")
    pub number: String,
    /// Pickup or otherwise uncounted measure
    pub implicit: bool,
    pub time: TimeSignature,
    pub key: Key,
    pub clef: Clef,
    /// Divisions per quarter note in force for this measure
    pub divisions: u32,
    pub transposition: Option<Transposition>,
    pub barlines: Barlines,
    #[serde(default)]
    packing: Packing,
    marks: Vec<Mark>,
    events: Vec<MeasureEvent>,
}

impl Measure {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            implicit: false,
            time: TimeSignature::default(),
            key: Key::default(),
            clef: Clef::default(),
            divisions: 1,
            transposition: None,
            barlines: Barlines::new(),
            packing: Packing::default(),
            marks: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// Switch the packing rule and repack
    pub fn set_packing(&mut self, packing: Packing) {
        self.packing = packing;
        self.pack();
    }

    /// Append a note, rest or group and repack offsets
    pub fn append(&mut self, event: impl Into<MeasureEvent>) {
        self.events.push(event.into());
        self.pack();
    }

    /// Append an ordered sequence, then repack once
    pub fn extend<I, E>(&mut self, events: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<MeasureEvent>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self.pack();
    }

    /// Add `note` to the chord formed by the last event.
    ///
    /// A single pitched note becomes a chord group; an existing chord group
    /// grows. Anything else cannot take a chord member.
    pub fn append_chord_note(&mut self, note: Note) -> Result<(), ModelError> {
        if note.is_rest() {
            return Err(ModelError::StructuralType(
                "a chord cannot contain a rest".to_string(),
            ));
        }

        let group = match self.events.pop() {
            Some(MeasureEvent::Note(first)) if !first.is_rest() => {
                NoteGroup::new(GroupKind::Chord, vec![first, note])?
            }
            Some(MeasureEvent::Group(mut group)) if group.kind() == GroupKind::Chord => {
                group.push(note)?;
                group
            }
            other => {
                self.events.extend(other);
                return Err(ModelError::StructuralType(
                    "chord note must follow a pitched note or chord".to_string(),
                ));
            }
        };

        self.events.push(group.into());
        self.pack();
        Ok(())
    }

    fn pack(&mut self) {
        let mut cursors: HashMap<u32, Ticks> = HashMap::new();
        let mut last_onset: HashMap<u32, Ticks> = HashMap::new();

        for event in &mut self.events {
            let voice = match self.packing {
                Packing::Sequential => 0,
                Packing::PerVoice => event.notes().first().map(|n| n.voice).unwrap_or(1),
            };
            let chord = matches!(event, MeasureEvent::Note(n) if n.chord);
            let cursor = cursors.entry(voice).or_insert(0);

            if chord {
                if let Some(onset) = last_onset.get(&voice) {
                    event.set_start_offset(*onset);
                    continue;
                }
            }

            event.set_start_offset(*cursor);
            last_onset.insert(voice, *cursor);
            *cursor += event.ticks();
        }
    }

    pub fn events(&self) -> &[MeasureEvent] {
        &self.events
    }

    /// Every note and rest, group members flattened, in append order
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.events.iter().flat_map(|e| e.notes().iter())
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Occupied length: the latest event end
    pub fn total_ticks(&self) -> Ticks {
        self.events
            .iter()
            .map(|e| e.start_offset() + e.ticks())
            .max()
            .unwrap_or(0)
    }

    /// Occupied length in whole notes
    pub fn total_duration(&self) -> Rational64 {
        Rational64::new(self.total_ticks(), TICKS_PER_WHOLE)
    }

    /// First note starting at or after `offset`; None past the last onset
    pub fn note_at_location(&self, offset: Ticks) -> Option<&Note> {
        self.notes()
            .filter(|n| n.start_offset >= offset)
            .min_by_key(|n| n.start_offset)
    }

    pub fn note_at_index(&self, index: usize) -> Option<&Note> {
        self.notes().nth(index)
    }

    pub fn add_mark(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new("1")
    }
}
