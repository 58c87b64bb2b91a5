//! MusicXML format converters
//!
//! This module contains the MusicXML importer.

pub mod musicxml_to_score;

// Re-export for convenience
pub use musicxml_to_score::{
    load_score,
    parse_score,
    Diagnostic,
    DiagnosticKind,
    DurationBasis,
    ImportError,
    ImportResult,
    ImportSettings,
    Location,
    UnrecognizedElementPolicy,
};
