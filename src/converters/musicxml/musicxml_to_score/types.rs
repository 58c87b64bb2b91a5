//! Public API types for MusicXML ingestion: settings, diagnostics, result

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

use super::errors::{ImportError, Location};
use crate::models::{Packing, ResolvedDuration, Score};

// ============================================================================
// SETTINGS
// ============================================================================

/// What to do with an element outside the recognized set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrecognizedElementPolicy {
    /// Abort the import
    #[default]
    Fail,
    /// Skip the element and record a diagnostic
    Skip,
}

/// How `<duration>` values are turned into whole-note fractions.
///
/// MusicXML divisions count subdivisions of a quarter note, so `Quarter`
/// is the default. `BeatType` divides by the time signature's beat type
/// instead; it agrees with `Quarter` only in x/4 meters and is kept for
/// compatibility with importers that read durations that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBasis {
    /// duration / (divisions × 4): divisions subdivide a quarter note
    #[default]
    Quarter,
    /// duration / divisions / beat-type
    BeatType,
}

/// Configuration options for ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub unrecognized_elements: UnrecognizedElementPolicy,

    pub duration_basis: DurationBasis,

    /// Merge chord-flagged notes into chord groups
    pub group_chords: bool,

    /// Keep the last measure of each staff FINAL
    pub auto_final_barline: bool,

    /// Start-offset rule for imported measures. `PerVoice` lays voices
    /// separated by `<backup>` over each other.
    pub packing: Packing,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            unrecognized_elements: UnrecognizedElementPolicy::Fail,
            duration_basis: DurationBasis::Quarter,
            group_chords: false,
            auto_final_barline: true,
            packing: Packing::Sequential,
        }
    }
}

impl ImportSettings {
    /// Load settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        serde_json::from_str(json).map_err(|e| ImportError::Settings(e.to_string()))
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Kind of a non-fatal condition met during ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A duration had no exact symbolic form and was substituted
    Approximation {
        requested: Rational64,
        nearest: ResolvedDuration,
    },
    /// Unrecognized element skipped under the Skip policy
    SkippedElement,
    /// Direction content that has no mark equivalent
    IgnoredDirection,
    /// Note without `<type>`; its symbolic value was inferred from `<duration>`
    InferredNoteType,
    /// A span never saw its stop element
    UnclosedSpan,
    /// A value the model cannot represent; a fallback was used
    UnsupportedAttribute,
    /// Grace note skipped
    GraceNote,
    /// `<part>` missing from `<part-list>`, or the other way round
    PartListMismatch,
}

/// A recovered, non-fatal condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    pub message: String,
}

/// Result of a successful import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub score: Score,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportResult {
    /// Diagnostics of one kind, compared by variant only
    pub fn diagnostics_of<'a>(
        &'a self,
        kind: &'a DiagnosticKind,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| std::mem::discriminant(&d.kind) == std::mem::discriminant(kind))
    }
}
