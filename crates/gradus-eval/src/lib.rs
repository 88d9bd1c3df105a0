//! Evaluation orchestration for the Gradus grader.
//!
//! Takes an ingested project and a rubric through the adaptive pipeline:
//! direct context for small projects, batching + summarization for large
//! ones, LLM-assisted triage when the file count exceeds the cap, then one
//! terminal structured evaluation whose aggregate numbers are recomputed
//! locally.
//!
//! - [`llm`] — chat client and the [`llm::Completion`] seam
//! - [`prompt`] — prompt construction and defensive response parsing
//! - [`batch`] — character-budgeted partitioning
//! - [`triage`] — LLM-assisted file down-selection
//! - [`summarize`] — concurrent per-batch digests
//! - [`evaluate`] — the terminal structured grading call
//! - [`pipeline`] — plan selection and end-to-end orchestration

pub mod batch;
pub mod evaluate;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod summarize;
pub mod triage;

pub use llm::{ChatMessage, Completion, LlmClient, Role};
pub use pipeline::{ContextPlan, EvaluationPipeline, Graded, PipelineStats};
