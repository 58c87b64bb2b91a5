//! MusicXML score ingestion
//!
//! Reads `score-partwise` MusicXML into an in-memory score model built on a
//! canonical note-duration engine. Durations are exact rationals resolved
//! against a fixed table of base values, dots and tuplet ratios.

pub mod converters;
pub mod models;

// Re-export commonly used types
pub use converters::musicxml::{load_score, parse_score, ImportError, ImportResult, ImportSettings};
pub use models::*;
