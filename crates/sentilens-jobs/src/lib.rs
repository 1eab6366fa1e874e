//! Sentilens Jobs
//!
//! Batch classification jobs and the analytics that run over their results.
//!
//! - [`JobStore`]: injectable registry of jobs keyed by [`JobId`]
//! - [`JobRunner`]: submits a text collection and classifies it in the
//!   background, publishing progress after every batch
//! - [`analytics`]: search, filter, correct, export and validate over a
//!   completed job
//! - [`validation`]: macro-F1, per-class precision/recall, confusion matrix
//!
//! [`JobId`]: sentilens_core::JobId

pub mod analytics;
pub mod job;
pub mod runner;
pub mod store;
pub mod validation;

pub use analytics::{correct, export, filter, search, validate_job};
pub use job::{Job, JobFailure, JobStatus, JobView};
pub use runner::{JobHandle, JobRunner, Preprocessing, RunnerConfig};
pub use store::JobStore;
pub use validation::{validate, validate_labels, ValidationMetrics};
