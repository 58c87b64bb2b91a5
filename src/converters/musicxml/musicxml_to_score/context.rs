//! Context threaded through the ingestion walk
//!
//! [`PartAttributes`] is the carried-forward state (divisions, time, key,
//! clefs, transposition) that a measure inherits when its attributes block
//! omits a value. Each part owns its own copy. [`ConversionContext`] adds
//! the settings, the current location and the diagnostics collected so far.

use log::{debug, warn};
use num_rational::Rational64;
use roxmltree::Node;

use super::errors::{ImportError, Location};
use super::parser::element_path;
use super::types::{Diagnostic, DiagnosticKind, DurationBasis, ImportSettings, UnrecognizedElementPolicy};
use crate::models::{checked_ticks, Clef, Key, Ticks, TimeSignature, Transposition};

/// Attributes in force, inherited across the measures of one part
#[derive(Debug, Clone, PartialEq)]
pub struct PartAttributes {
    /// Divisions per quarter note
    pub divisions: u32,
    pub time: TimeSignature,
    pub key: Key,
    /// Clef per staff, index 0 = staff 1
    pub clefs: Vec<Clef>,
    pub staves: usize,
    pub transposition: Option<Transposition>,
}

impl Default for PartAttributes {
    fn default() -> Self {
        Self {
            divisions: 1,
            time: TimeSignature::default(),
            key: Key::default(),
            clefs: vec![Clef::default()],
            staves: 1,
            transposition: None,
        }
    }
}

impl PartAttributes {
    /// Clef of 0-based `staff`
    pub fn clef(&self, staff: usize) -> Clef {
        self.clefs.get(staff).copied().unwrap_or_default()
    }

    pub fn set_clef(&mut self, staff: usize, clef: Clef) {
        if staff >= self.clefs.len() {
            self.clefs.resize(staff + 1, Clef::default());
        }
        self.clefs[staff] = clef;
    }

    pub fn set_staves(&mut self, staves: usize) {
        self.staves = staves.max(1);
        if self.clefs.len() < self.staves {
            self.clefs.resize(self.staves, Clef::default());
        }
    }
}

/// Mutable state of one import
pub struct ConversionContext<'s> {
    pub settings: &'s ImportSettings,
    pub part_index: Option<usize>,
    pub part_id: String,
    pub measure_index: Option<usize>,
    pub attributes: PartAttributes,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'s> ConversionContext<'s> {
    pub fn new(settings: &'s ImportSettings) -> Self {
        Self {
            settings,
            part_index: None,
            part_id: String::new(),
            measure_index: None,
            attributes: PartAttributes::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Enter a new part with freshly seeded attributes
    pub fn begin_part(&mut self, index: usize, id: &str) {
        self.part_index = Some(index);
        self.part_id = id.to_string();
        self.measure_index = None;
        self.attributes = PartAttributes::default();
    }

    pub fn location(&self, node: Node) -> Location {
        Location {
            path: element_path(node),
            part: self.part_index,
            measure: self.measure_index,
        }
    }

    /// Record a non-fatal condition
    pub fn add_diagnostic(&mut self, kind: DiagnosticKind, node: Node, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            location: self.location(node),
            message: message.into(),
        };
        warn!("{} at {}", diagnostic.message, diagnostic.location);
        self.diagnostics.push(diagnostic);
    }

    /// Apply the unrecognized-element policy to `node`
    pub fn unrecognized(&mut self, node: Node) -> Result<(), ImportError> {
        let element = node.tag_name().name().to_string();
        match self.settings.unrecognized_elements {
            UnrecognizedElementPolicy::Fail => Err(ImportError::UnrecognizedElement {
                element,
                location: self.location(node),
            }),
            UnrecognizedElementPolicy::Skip => {
                self.add_diagnostic(
                    DiagnosticKind::SkippedElement,
                    node,
                    format!("Skipped unrecognized element <{}>", element),
                );
                Ok(())
            }
        }
    }

    pub fn invalid_value(&self, node: Node, value: impl Into<String>) -> ImportError {
        ImportError::InvalidAttributeValue {
            element: node.tag_name().name().to_string(),
            value: value.into(),
            location: self.location(node),
        }
    }

    pub fn missing(&self, node: Node, element: &str) -> ImportError {
        ImportError::MissingElement {
            element: element.to_string(),
            location: self.location(node),
        }
    }

    /// Whole-note value of a `<duration>`, `<backup>` or `<forward>` amount
    pub fn whole_notes(&self, divisions_amount: i64) -> Rational64 {
        let divisions = self.attributes.divisions.max(1) as i64;
        let denominator = match self.settings.duration_basis {
            DurationBasis::Quarter => divisions * 4,
            DurationBasis::BeatType => divisions * self.attributes.time.beat_type.max(1) as i64,
        };
        Rational64::new(divisions_amount, denominator)
    }

    /// Same amount on the tick timeline. `node` is the element holding the
    /// amount; values past the timeline range are rejected there.
    pub fn ticks(&self, node: Node, divisions_amount: i64) -> Result<Ticks, ImportError> {
        let ticks = checked_ticks(self.whole_notes(divisions_amount))
            .ok_or_else(|| self.invalid_value(node, divisions_amount.to_string()))?;
        debug!("{} divisions -> {} ticks", divisions_amount, ticks);
        Ok(ticks)
    }
}
