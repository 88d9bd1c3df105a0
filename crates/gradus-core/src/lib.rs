//! Core types, configuration, and error handling for the Gradus grader.
//!
//! This crate provides the shared foundation used by all other Gradus crates:
//! - [`GradusError`] — unified error type using `thiserror`
//! - [`GradusConfig`] — configuration loaded from `.gradus.toml`
//! - Shared types: [`NormalizedFile`], [`Batch`], [`Digest`],
//!   [`EvaluationItem`], [`EvaluationResult`], [`OutputFormat`]
//! - [`GradingScale`] — deterministic score-to-grade mapping and aggregation

mod config;
mod error;
pub mod grading;
pub mod rubric;
mod types;

pub use config::{GradingConfig, GradusConfig, IngestConfig, LlmConfig, PipelineConfig};
pub use error::GradusError;
pub use grading::{aggregate, GradingScale};
pub use types::{
    Batch, CandidateFile, Digest, EvaluationItem, EvaluationResult, NormalizedFile, OutputFormat,
};

/// A convenience `Result` type for Gradus operations.
pub type Result<T> = std::result::Result<T, GradusError>;
