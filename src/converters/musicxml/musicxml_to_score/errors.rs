//! Error types for MusicXML ingestion
//!
//! Fatal conditions abort the whole document and carry the offending
//! element's location. Recoverable conditions are reported as
//! [`Diagnostic`](super::types::Diagnostic)s instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ModelError;

/// Where in the document something happened
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Element path such as `/score-partwise/part[1]/measure[3]/note[2]`
    pub path: String,
    /// 0-based index of the `<part>` element
    pub part: Option<usize>,
    /// 0-based index of the `<measure>` within its part
    pub measure: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        match (self.part, self.measure) {
            (Some(part), Some(measure)) => write!(f, " (part {}, measure {})", part, measure),
            (Some(part), None) => write!(f, " (part {})", part),
            _ => Ok(()),
        }
    }
}

/// Fatal ingestion errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// The input file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// XML is malformed (not well-formed)
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Known MusicXML layout that is not supported (score-timewise)
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),

    /// Element kind outside the recognized set for its context
    #[error("Unrecognized element <{element}> at {location}")]
    UnrecognizedElement { element: String, location: Location },

    /// Enumerated or numeric value that could not be interpreted
    #[error("Invalid value '{value}' for <{element}> at {location}")]
    InvalidAttributeValue {
        element: String,
        value: String,
        location: Location,
    },

    /// Required structural element is missing
    #[error("Missing required element <{element}> at {location}")]
    MissingElement { element: String, location: Location },

    /// Settings could not be loaded
    #[error("Invalid import settings: {0}")]
    Settings(String),

    /// The document model rejected a value
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
