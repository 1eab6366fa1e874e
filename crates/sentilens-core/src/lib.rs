//! Sentilens Core
//!
//! Core types and error handling shared across Sentilens components.
//!
//! This crate provides:
//! - Sentiment labels and per-text predictions
//! - Records and the fixed-shape result table produced by a classification job
//! - Job identifiers
//! - The error taxonomy surfaced to callers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ExportRow, JobId, Label, LabelCounts, Prediction, Record, ResultTable, ResultTableBuilder,
    TextInput,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{JobId, Label, Prediction, Record, ResultTable, TextInput};
}
