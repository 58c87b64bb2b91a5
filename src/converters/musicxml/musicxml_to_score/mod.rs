//! MusicXML to score model importer
//!
//! Reads a `score-partwise` MusicXML document into a [`Score`].
//!
//! # Overview
//!
//! 1. **Parse**: roxmltree builds a read-only tree (DOCTYPE allowed)
//! 2. **Header**: metadata and the part list, grouped into systems
//! 3. **Walk**: each `<part>`, measure by measure, carrying divisions,
//!    key, time, clefs and transposition forward
//!
//! Fatal problems abort with an [`ImportError`] naming the element path.
//! Recoverable ones (approximated durations, skipped grace notes,
//! directions with no model equivalent) are collected as [`Diagnostic`]s.
//!
//! # Basic Usage
//!
//! ```ignore
//! use musicxml_score::converters::musicxml::{parse_score, ImportSettings};
//!
//! let result = parse_score(xml, &ImportSettings::default())?;
//! for part in result.score.parts() {
//!     println!("{}: {} measures", part.name, part.measure_count());
//! }
//! ```

pub mod attributes;
pub mod context;
pub mod direction;
pub mod errors;
pub mod measure;
pub mod note;
pub mod parser;
pub mod part;
pub mod types;


pub use errors::{ImportError, Location};
pub use types::{
    Diagnostic, DiagnosticKind, DurationBasis, ImportResult, ImportSettings,
    UnrecognizedElementPolicy,
};

use log::info;
use std::fs;
use std::path::Path;

use crate::models::{Part, PartSystem, Score};
use context::ConversionContext;
use parser::{element_children, element_path, extract_metadata, extract_systems, parse_document};

/// Top-level children of `<score-partwise>` that need no walk of their own
const HEADER_ELEMENTS: &[&str] = &[
    "work",
    "movement-number",
    "movement-title",
    "identification",
    "defaults",
    "credit",
    "part-list",
];

/// Parse MusicXML text into a score.
///
/// # Returns
///
/// * `Ok(ImportResult)` - the score plus any diagnostics
/// * `Err(ImportError)` - malformed XML, a timewise document, or an element
///   the current settings refuse
pub fn parse_score(xml: &str, settings: &ImportSettings) -> Result<ImportResult, ImportError> {
    let doc = parse_document(xml)?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "score-partwise" => {}
        "score-timewise" => {
            return Err(ImportError::UnsupportedFormat(
                "score-timewise documents must be converted to score-partwise first".to_string(),
            ))
        }
        other => {
            return Err(ImportError::UnrecognizedElement {
                element: other.to_string(),
                location: Location {
                    path: element_path(root),
                    ..Location::default()
                },
            })
        }
    }

    let mut context = ConversionContext::new(settings);
    let mut score = Score::new();
    score.metadata = extract_metadata(root);
    let layouts = extract_systems(root);

    // parts in document order; taken out as systems claim them
    let mut parts: Vec<Option<Part>> = Vec::new();
    for child in element_children(root) {
        match child.tag_name().name() {
            "part" => {
                let id = child.attribute("id");
                let info = layouts
                    .iter()
                    .flat_map(|layout| layout.parts.iter())
                    .find(|info| Some(info.id.as_str()) == id);
                let part = part::convert_part(child, parts.len(), info, &mut context)?;
                if info.is_none() {
                    context.add_diagnostic(
                        DiagnosticKind::PartListMismatch,
                        child,
                        format!("Part '{}' is not declared in the part list", part.id),
                    );
                }
                parts.push(Some(part));
            }
            name if HEADER_ELEMENTS.contains(&name) => {}
            _ => context.unrecognized(child)?,
        }
    }
    context.part_index = None;

    if parts.is_empty() {
        return Err(context.missing(root, "part"));
    }

    for layout in &layouts {
        let mut members = Vec::new();
        for info in &layout.parts {
            let found = parts
                .iter_mut()
                .find(|slot| slot.as_ref().map_or(false, |p| p.id == info.id))
                .and_then(Option::take);
            match found {
                Some(part) => members.push(part),
                None => context.add_diagnostic(
                    DiagnosticKind::PartListMismatch,
                    root,
                    format!("Part '{}' is listed but has no <part> element", info.id),
                ),
            }
        }
        if members.is_empty() {
            continue;
        }

        let mut system = PartSystem::new(layout.symbol);
        system.name = layout.name.clone();
        score.append(system);
        for part in members {
            score.append_to_latest_part_system(part)?;
        }
    }

    let unlisted: Vec<Part> = parts.into_iter().flatten().collect();
    if !unlisted.is_empty() {
        score.append(PartSystem::default());
        for part in unlisted {
            score.append_to_latest_part_system(part)?;
        }
    }

    info!(
        "Imported score with {} parts in {} systems ({} diagnostics)",
        score.part_count(),
        score.part_systems().len(),
        context.diagnostics.len()
    );

    Ok(ImportResult {
        score,
        diagnostics: context.diagnostics,
    })
}

/// Read and parse a MusicXML file
pub fn load_score(path: impl AsRef<Path>, settings: &ImportSettings) -> Result<ImportResult, ImportError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_score(&xml, settings)
}
