//! Error types for the score document model
//!
//! These cover misuse of the model's mutation and construction APIs.
//! Ingestion failures live in the converter's own error hierarchy and
//! wrap these when a model call rejects a value.

use thiserror::Error;

/// Errors raised by the document model and the duration algebra
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A mutation API received a value shape it cannot hold
    #[error("Structural type error: {0}")]
    StructuralType(String),

    /// A part was appended before any part system existed
    #[error("No part system to append part '{part_id}' to")]
    NoPartSystem { part_id: String },

    /// Tuplet ratio with a zero term
    #[error("Invalid tuplet ratio {actual}:{normal} (both terms must be positive)")]
    InvalidRatio { actual: u32, normal: u32 },

    /// Augmentation dot count outside 0-4
    #[error("Invalid dot count: {0} (must be 0-4)")]
    InvalidDots(usize),

    /// Key signature outside the circle of fifths
    #[error("Invalid key fifths: {0} (must be -7 to +7)")]
    InvalidKey(i32),

    /// NaN or infinite duration value
    #[error("Duration value {0} is not finite")]
    NonFiniteDuration(f64),
}
