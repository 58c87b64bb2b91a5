//! Format converters
//!
//! This module contains converters from external notation formats into the score model.

pub mod musicxml;
