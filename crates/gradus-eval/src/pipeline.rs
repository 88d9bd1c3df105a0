use std::fmt;

use gradus_core::{rubric, GradusConfig, NormalizedFile, Result};
use gradus_ingest::IngestedProject;
use serde::Serialize;
use tracing::info;

use crate::batch;
use crate::evaluate;
use crate::llm::Completion;
use crate::prompt;
use crate::summarize;
use crate::triage;

/// How the evaluator's context is built, selected once up front from the
/// input size, not rediscovered condition by condition mid-pipeline.
///
/// - `Direct`: the whole project fits the batch budget; raw content goes
///   straight to the evaluator, skipping triage and summarization.
/// - `Summarized`: too large for direct context; batch and summarize.
/// - `Triaged`: too many files; LLM triage down-selects first, then batch
///   and summarize. The count check runs first because the cap is about
///   file count, independent of content size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPlan {
    /// Raw file content directly to the evaluator.
    Direct,
    /// Batched content summarized into digests.
    Summarized,
    /// Triage down-selection, then batched digests.
    Triaged,
}

impl ContextPlan {
    /// Choose the plan for a file set.
    ///
    /// # Examples
    ///
    /// ```
    /// use gradus_core::{NormalizedFile, PipelineConfig};
    /// use gradus_eval::pipeline::ContextPlan;
    ///
    /// let small = vec![NormalizedFile { path: "a.py".into(), text: "x".into() }];
    /// assert_eq!(ContextPlan::select(&small, &PipelineConfig::default()), ContextPlan::Direct);
    /// ```
    pub fn select(files: &[NormalizedFile], config: &gradus_core::PipelineConfig) -> Self {
        if files.len() > config.max_files {
            ContextPlan::Triaged
        } else if batch::total_wrapped_len(files) <= config.batch_char_budget {
            ContextPlan::Direct
        } else {
            ContextPlan::Summarized
        }
    }
}

impl fmt::Display for ContextPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextPlan::Direct => write!(f, "direct"),
            ContextPlan::Summarized => write!(f, "summarized"),
            ContextPlan::Triaged => write!(f, "triaged"),
        }
    }
}

/// Statistics about one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    /// Files that reached the evaluator (post-triage when it ran).
    pub files_evaluated: usize,
    /// Batches summarized; 0 under the direct plan.
    pub batches_summarized: usize,
    /// The plan selected up front.
    pub plan: ContextPlan,
    /// Model identifier used for the run.
    pub model_used: String,
}

/// A completed, aggregated evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Graded {
    /// Project name (repository or archive).
    pub project_name: String,
    /// The ref that was read, for hosted sources.
    pub resolved_ref: Option<String>,
    /// The graded report, aggregates recomputed.
    pub result: gradus_core::EvaluationResult,
    /// Run statistics.
    pub stats: PipelineStats,
}

/// Evaluation orchestrator: plan selection, optional triage and
/// summarization, the terminal evaluation call, and aggregation.
pub struct EvaluationPipeline<C> {
    llm: C,
    config: GradusConfig,
}

impl<C: Completion> EvaluationPipeline<C> {
    /// Create a pipeline from a completion client and configuration.
    pub fn new(llm: C, config: GradusConfig) -> Self {
        Self { llm, config }
    }

    /// Grade one ingested project against a rubric.
    ///
    /// # Errors
    ///
    /// Returns [`gradus_core::GradusError::Rubric`] for a structurally
    /// invalid rubric, and propagates terminal evaluation failures
    /// (`UpstreamService`, `MalformedLlmResponse`). Triage and
    /// summarization failures are absorbed with fallbacks and never abort
    /// the run.
    pub async fn run(&self, project: IngestedProject, rubric_text: &str) -> Result<Graded> {
        rubric::validate(rubric_text)?;

        let IngestedProject {
            name,
            resolved_ref,
            files,
            security_flag,
        } = project;

        let plan = ContextPlan::select(&files, &self.config.pipeline);
        info!(
            project = %name,
            files = files.len(),
            %plan,
            "selected evaluation plan"
        );

        let (context, files_evaluated, batches_summarized) = match plan {
            ContextPlan::Direct => {
                let context = prompt::build_direct_context(&files);
                (context, files.len(), 0)
            }
            ContextPlan::Summarized => self.summarized_context(files, rubric_text, false).await,
            ContextPlan::Triaged => self.summarized_context(files, rubric_text, true).await,
        };

        let result = evaluate::evaluate(
            &self.llm,
            rubric_text,
            &context,
            security_flag.as_deref(),
            &self.config.grading.scale(),
        )
        .await?;

        Ok(Graded {
            project_name: name,
            resolved_ref,
            result,
            stats: PipelineStats {
                files_evaluated,
                batches_summarized,
                plan,
                model_used: self.llm.model().to_string(),
            },
        })
    }

    async fn summarized_context(
        &self,
        files: Vec<NormalizedFile>,
        rubric_text: &str,
        run_triage: bool,
    ) -> (String, usize, usize) {
        let files = if run_triage {
            triage::triage(
                &self.llm,
                files,
                rubric_text,
                self.config.pipeline.max_files,
            )
            .await
        } else {
            files
        };

        let batches = batch::partition(files.clone(), self.config.pipeline.batch_char_budget);
        let digests = summarize::summarize_batches(
            &self.llm,
            &batches,
            self.config.pipeline.summary_concurrency,
        )
        .await;

        let context = prompt::build_digest_context(&files, &digests);
        (context, files.len(), batches.len())
    }
}

impl fmt::Display for Graded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation Report — {}", self.project_name)?;
        writeln!(f, "==================")?;
        if let Some(git_ref) = &self.resolved_ref {
            writeln!(f, "Ref: {git_ref}")?;
        }
        writeln!(
            f,
            "Model: {} | Files: {} | Plan: {} | Batches: {}\n",
            self.stats.model_used,
            self.stats.files_evaluated,
            self.stats.plan,
            self.stats.batches_summarized,
        )?;
        writeln!(f, "Overall score: {:.1} / 100", self.result.overall_score)?;
        writeln!(f, "Final grade:   {:.1}\n", self.result.final_grade)?;

        for item in &self.result.report {
            writeln!(f, "[{:>5.1}] {}", item.score, item.criterion)?;
            for line in item.feedback.lines() {
                writeln!(f, "    {line}")?;
            }
            writeln!(f)?;
        }

        if !self.result.summary.is_empty() {
            writeln!(f, "Summary\n-------\n{}\n", self.result.summary)?;
        }
        if !self.result.professionalism_summary.is_empty() {
            writeln!(
                f,
                "Professionalism\n---------------\n{}",
                self.result.professionalism_summary
            )?;
        }
        Ok(())
    }
}

impl Graded {
    /// Render the graded report as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use gradus_core::EvaluationResult;
    /// use gradus_eval::pipeline::{ContextPlan, Graded, PipelineStats};
    ///
    /// let graded = Graded {
    ///     project_name: "demo".into(),
    ///     resolved_ref: None,
    ///     result: EvaluationResult {
    ///         overall_score: 0.0,
    ///         summary: String::new(),
    ///         professionalism_summary: String::new(),
    ///         report: vec![],
    ///         final_grade: 1.0,
    ///     },
    ///     stats: PipelineStats {
    ///         files_evaluated: 0,
    ///         batches_summarized: 0,
    ///         plan: ContextPlan::Direct,
    ///         model_used: "gpt-4o".into(),
    ///     },
    /// };
    /// assert!(graded.to_markdown().contains("# Evaluation Report — demo"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Evaluation Report — {}\n\n", self.project_name));
        if let Some(git_ref) = &self.resolved_ref {
            out.push_str(&format!("**Ref:** `{git_ref}`\n\n"));
        }
        out.push_str(&format!(
            "**Model:** {} | **Files:** {} | **Plan:** {} | **Batches:** {}\n\n",
            self.stats.model_used,
            self.stats.files_evaluated,
            self.stats.plan,
            self.stats.batches_summarized,
        ));
        out.push_str(&format!(
            "**Overall score:** {:.1} / 100 — **Final grade:** {:.1}\n\n",
            self.result.overall_score, self.result.final_grade,
        ));

        for item in &self.result.report {
            out.push_str(&format!(
                "## {} — {:.1}/100\n\n{}\n\n",
                item.criterion, item.score, item.feedback
            ));
        }

        if !self.result.summary.is_empty() {
            out.push_str(&format!("## Summary\n\n{}\n\n", self.result.summary));
        }
        if !self.result.professionalism_summary.is_empty() {
            out.push_str(&format!(
                "## Professionalism\n\n{}\n",
                self.result.professionalism_summary
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_core::{EvaluationItem, EvaluationResult, PipelineConfig};

    fn file(path: &str, len: usize) -> NormalizedFile {
        NormalizedFile {
            path: path.to_string(),
            text: "x".repeat(len),
        }
    }

    #[test]
    fn small_project_is_direct() {
        let files = vec![file("a.py", 100), file("b.py", 100)];
        let plan = ContextPlan::select(&files, &PipelineConfig::default());
        assert_eq!(plan, ContextPlan::Direct);
    }

    #[test]
    fn oversized_content_is_summarized() {
        let files = vec![file("a.py", 200_000)];
        let plan = ContextPlan::select(&files, &PipelineConfig::default());
        assert_eq!(plan, ContextPlan::Summarized);
    }

    #[test]
    fn too_many_files_is_triaged_regardless_of_size() {
        // 501 tiny files: far under the character budget, over the count cap.
        let files: Vec<NormalizedFile> =
            (0..501).map(|i| file(&format!("f{i}.py"), 1)).collect();
        let plan = ContextPlan::select(&files, &PipelineConfig::default());
        assert_eq!(plan, ContextPlan::Triaged);
    }

    #[test]
    fn count_at_the_cap_is_not_triaged() {
        let files: Vec<NormalizedFile> =
            (0..500).map(|i| file(&format!("f{i}.py"), 1)).collect();
        let plan = ContextPlan::select(&files, &PipelineConfig::default());
        assert_ne!(plan, ContextPlan::Triaged);
    }

    #[test]
    fn display_and_markdown_render_report() {
        let graded = Graded {
            project_name: "ml-project".into(),
            resolved_ref: Some("master".into()),
            result: EvaluationResult {
                overall_score: 80.0,
                summary: "Good overall.".into(),
                professionalism_summary: "Clean layout.".into(),
                report: vec![EvaluationItem {
                    criterion: "Structure".into(),
                    score: 80.0,
                    feedback: "Well organized.".into(),
                }],
                final_grade: 5.5,
            },
            stats: PipelineStats {
                files_evaluated: 12,
                batches_summarized: 0,
                plan: ContextPlan::Direct,
                model_used: "gpt-4o".into(),
            },
        };

        let text = format!("{graded}");
        assert!(text.contains("ml-project"));
        assert!(text.contains("Ref: master"));
        assert!(text.contains("Overall score: 80.0"));
        assert!(text.contains("[ 80.0] Structure"));

        let md = graded.to_markdown();
        assert!(md.contains("# Evaluation Report — ml-project"));
        assert!(md.contains("## Structure — 80.0/100"));
        assert!(md.contains("**Final grade:** 5.5"));
    }
}
