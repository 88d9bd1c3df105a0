use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A file surviving the listing filter, not yet fetched.
///
/// `handle` is the blob identifier when the listing strategy provides one
/// (the authenticated GitHub tree does); anonymous and archive listings
/// refetch by path and leave it empty.
///
/// # Examples
///
/// ```
/// use gradus_core::CandidateFile;
///
/// let file = CandidateFile {
///     path: "src/pipeline.py".into(),
///     handle: None,
/// };
/// assert!(file.handle.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Path relative to the project root, unique within a run.
    pub path: String,
    /// Opaque content identifier, when the listing source provides one.
    pub handle: Option<String>,
}

/// A fetched file reduced to analyzable text.
///
/// Produced by the fetcher + normalizer; immutable once created. Every path
/// in a run is unique, and a file is either fully present here or was
/// dropped with a logged reason; never half-populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    /// Path relative to the project root.
    pub path: String,
    /// Normalized text content.
    pub text: String,
}

/// An ordered slice of files whose combined serialized size fits the
/// character budget (except when a single file alone exceeds it).
#[derive(Debug, Clone)]
pub struct Batch {
    /// Position in discovery order; digests are reassembled by this index.
    pub index: usize,
    /// Files in insertion order.
    pub files: Vec<NormalizedFile>,
}

/// A non-judgmental textual summary of one batch.
#[derive(Debug, Clone)]
pub struct Digest {
    /// Index of the batch this digest describes.
    pub batch_index: usize,
    /// Summary text, or a placeholder when summarization failed.
    pub text: String,
}

/// Evaluation of a single rubric criterion.
///
/// # Examples
///
/// ```
/// use gradus_core::EvaluationItem;
///
/// let item = EvaluationItem {
///     criterion: "Documentation".into(),
///     score: 85.0,
///     feedback: "Clear README, sparse docstrings.".into(),
/// };
/// assert!(item.score <= 100.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationItem {
    /// Criterion name, as named in the rubric.
    pub criterion: String,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Markdown feedback for this criterion.
    pub feedback: String,
}

/// The complete graded report for a project.
///
/// `overall_score` and `final_grade` are derived fields: the aggregator
/// recomputes both from `report`, discarding whatever the LLM reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Arithmetic mean of the per-criterion scores, in `[0, 100]`.
    pub overall_score: f64,
    /// Overall narrative summary.
    pub summary: String,
    /// Analysis of professionalism, structure, and security practice.
    pub professionalism_summary: String,
    /// Per-criterion evaluations.
    pub report: Vec<EvaluationItem>,
    /// Grade on the configured target scale, one-decimal precision.
    pub final_grade: f64,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use gradus_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal report (default).
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// GitHub-flavored Markdown.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
