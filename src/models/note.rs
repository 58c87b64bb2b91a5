//! Notes, rests and note groups
//!
//! A rest is a [`Note`] without a pitch. A [`NoteGroup`] owns its child
//! notes and stands in for a single event on the measure timeline.

use serde::{Deserialize, Serialize};

use super::duration::{ResolvedDuration, Ticks};
use super::errors::ModelError;
use super::pitch::{Accidental, Pitch};

/// Stem direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StemDirection {
    Up,
    Down,
    Double,
    None,
}

impl StemDirection {
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "up" => Some(StemDirection::Up),
            "down" => Some(StemDirection::Down),
            "double" => Some(StemDirection::Double),
            "none" => Some(StemDirection::None),
            _ => None,
        }
    }
}

/// Beam state for one beam level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamState {
    Begin,
    Continue,
    End,
    ForwardHook,
    BackwardHook,
}

impl BeamState {
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "begin" => Some(BeamState::Begin),
            "continue" => Some(BeamState::Continue),
            "end" => Some(BeamState::End),
            "forward hook" => Some(BeamState::ForwardHook),
            "backward hook" => Some(BeamState::BackwardHook),
            _ => None,
        }
    }
}

/// Beam data (1 = eighth-note beam, 2 = sixteenth, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Beam {
    pub number: u8,
    pub state: BeamState,
}

/// Tie type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TieType {
    Start,
    Stop,
}

/// Syllabic type for lyrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Syllabic {
    #[default]
    Single,
    Begin,
    Middle,
    End,
}

/// Lyric syllable attached to a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyric {
    pub number: u32,
    pub syllabic: Syllabic,
    pub text: String,
}

/// A note, or a rest when `pitch` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub duration: ResolvedDuration,
    pub pitch: Option<Pitch>,
    /// 1-based voice number
    pub voice: u32,
    /// 1-based staff number within the part
    pub staff: u32,
    pub stem: Option<StemDirection>,
    pub beams: Vec<Beam>,
    pub ties: Vec<TieType>,
    pub lyrics: Vec<Lyric>,
    /// Accidental sign to draw, if any
    pub accidental: Option<Accidental>,
    pub show_accidental: bool,
    /// Shares its onset with the preceding note
    pub chord: bool,
    /// Position in the owning measure; maintained by the measure
    pub start_offset: Ticks,
}

impl Note {
    pub fn new(pitch: Pitch, duration: ResolvedDuration) -> Self {
        Self::with_pitch(Some(pitch), duration)
    }

    pub fn rest(duration: ResolvedDuration) -> Self {
        Self::with_pitch(None, duration)
    }

    fn with_pitch(pitch: Option<Pitch>, duration: ResolvedDuration) -> Self {
        Self {
            duration,
            pitch,
            voice: 1,
            staff: 1,
            stem: None,
            beams: Vec::new(),
            ties: Vec::new(),
            lyrics: Vec::new(),
            accidental: None,
            show_accidental: false,
            chord: false,
            start_offset: 0,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }

    pub fn ticks(&self) -> Ticks {
        self.duration.ticks()
    }

    /// Glyph for the note head or rest symbol
    pub fn glyph(&self) -> &'static str {
        if self.is_rest() {
            self.duration.base.rest_glyph()
        } else {
            self.duration.base.note_glyph()
        }
    }

    pub fn accidental_glyph(&self) -> Option<&'static str> {
        if self.show_accidental {
            self.accidental.map(Accidental::glyph)
        } else {
            None
        }
    }
}

/// What binds the notes of a group together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    Tied,
    Trilled,
    Tuplet,
    Beamed,
    /// Simultaneous notes sharing one onset
    Chord,
}

/// Container that behaves as one event but owns a sequence of notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteGroup {
    kind: GroupKind,
    notes: Vec<Note>,
    start_offset: Ticks,
}

impl NoteGroup {
    /// Group `notes`, taking ownership of them
    pub fn new(kind: GroupKind, notes: Vec<Note>) -> Result<Self, ModelError> {
        if notes.is_empty() {
            return Err(ModelError::StructuralType(format!(
                "{:?} group needs at least one note",
                kind
            )));
        }
        let mut group = Self {
            kind,
            notes: Vec::with_capacity(notes.len()),
            start_offset: 0,
        };
        for note in notes {
            group.push(note)?;
        }
        Ok(group)
    }

    /// Move one more note into the group
    pub fn push(&mut self, note: Note) -> Result<(), ModelError> {
        if self.kind == GroupKind::Chord && note.is_rest() {
            return Err(ModelError::StructuralType(
                "a chord cannot contain a rest".to_string(),
            ));
        }
        self.notes.push(note);
        self.set_start_offset(self.start_offset);
        Ok(())
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Give the children back, dissolving the group
    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    pub fn start_offset(&self) -> Ticks {
        self.start_offset
    }

    /// Timeline length: the longest member of a chord, the sum otherwise
    pub fn ticks(&self) -> Ticks {
        match self.kind {
            GroupKind::Chord => self.notes.iter().map(Note::ticks).max().unwrap_or(0),
            _ => self.notes.iter().map(Note::ticks).sum(),
        }
    }

    /// Group length as a resolved duration
    pub fn duration(&self) -> ResolvedDuration {
        match self.kind {
            GroupKind::Chord => self
                .notes
                .iter()
                .map(|n| n.duration)
                .max()
                .unwrap_or_else(|| self.notes[0].duration),
            _ => {
                let total = self
                    .notes
                    .iter()
                    .map(|n| n.duration.scalar())
                    .fold(num_rational::Rational64::from_integer(0), |acc, v| acc + v);
                ResolvedDuration::resolve(total).duration()
            }
        }
    }

    pub(crate) fn set_start_offset(&mut self, offset: Ticks) {
        self.start_offset = offset;
        let mut cursor = offset;
        for note in &mut self.notes {
            note.start_offset = cursor;
            if self.kind != GroupKind::Chord {
                cursor += note.ticks();
            }
        }
    }
}

/// One entry on a measure timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasureEvent {
    Note(Note),
    Group(NoteGroup),
}

impl MeasureEvent {
    pub fn ticks(&self) -> Ticks {
        match self {
            MeasureEvent::Note(note) => note.ticks(),
            MeasureEvent::Group(group) => group.ticks(),
        }
    }

    pub fn duration(&self) -> ResolvedDuration {
        match self {
            MeasureEvent::Note(note) => note.duration,
            MeasureEvent::Group(group) => group.duration(),
        }
    }

    pub fn start_offset(&self) -> Ticks {
        match self {
            MeasureEvent::Note(note) => note.start_offset,
            MeasureEvent::Group(group) => group.start_offset(),
        }
    }

    pub(crate) fn set_start_offset(&mut self, offset: Ticks) {
        match self {
            MeasureEvent::Note(note) => note.start_offset = offset,
            MeasureEvent::Group(group) => group.set_start_offset(offset),
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            MeasureEvent::Note(note) => Some(note),
            MeasureEvent::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&NoteGroup> {
        match self {
            MeasureEvent::Group(group) => Some(group),
            MeasureEvent::Note(_) => None,
        }
    }

    /// Every note in the event, group members included
    pub fn notes(&self) -> &[Note] {
        match self {
            MeasureEvent::Note(note) => std::slice::from_ref(note),
            MeasureEvent::Group(group) => group.notes(),
        }
    }
}

impl From<Note> for MeasureEvent {
    fn from(note: Note) -> Self {
        MeasureEvent::Note(note)
    }
}

impl From<NoteGroup> for MeasureEvent {
    fn from(group: NoteGroup) -> Self {
        MeasureEvent::Group(group)
    }
}
