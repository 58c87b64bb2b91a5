//! Models module for the score document
//!
//! Duration algebra and engine, pitch/key/attribute value types and the
//! Score → PartSystem → Part → Measure → Note containment hierarchy.

pub mod attributes;
pub mod barlines;
pub mod duration;
pub mod duration_table;
pub mod errors;
pub mod key;
pub mod marks;
pub mod measure;
pub mod note;
pub mod part;
pub mod pitch;
pub mod score;

// Re-export commonly used types
pub use attributes::{Clef, ClefSign, TimeSignature, TimeSymbol, Transposition};
pub use barlines::{Barline, BarlineLocation, BarlineType, Barlines};
pub use duration::{
    checked_ticks, scalar_of, ticks_of, BaseDuration, Dots, DurationKey, Ratio, ResolvedDuration, Ticks,
    TupletName, TICKS_PER_WHOLE,
};
pub use duration_table::{DurationTable, Resolution};
pub use errors::ModelError;
pub use key::{Key, KeyService, Mode};
pub use marks::{HairpinKind, Mark, MarkExtent, MarkKind, Placement};
pub use measure::{Measure, Packing};
pub use note::{
    Beam, BeamState, GroupKind, Lyric, MeasureEvent, Note, NoteGroup, StemDirection, Syllabic,
    TieType,
};
pub use part::Part;
pub use pitch::{Accidental, Pitch, Step};
pub use score::{Creator, GroupSymbol, PartSystem, Score, ScoreMetadata};
