//! The terminal structured evaluation call.

use gradus_core::{grading, EvaluationResult, GradingScale, Result};
use tracing::debug;

use crate::llm::{ChatMessage, Completion};
use crate::prompt;

/// Run the single terminal grading call and recompute its aggregates.
///
/// The security flag, when raised, is prepended verbatim to the project
/// context so the evaluator sees it exactly once. The response must parse
/// into per-criterion entries; there is no retry and no fallback here, since a
/// wrong or empty grade is worse than a visible error.
///
/// # Errors
///
/// Propagates [`gradus_core::GradusError::UpstreamService`] from the call
/// itself and [`gradus_core::GradusError::MalformedLlmResponse`] from
/// parsing.
pub async fn evaluate<C>(
    llm: &C,
    rubric: &str,
    context: &str,
    security_flag: Option<&str>,
    scale: &GradingScale,
) -> Result<EvaluationResult>
where
    C: Completion + ?Sized,
{
    let context = match security_flag {
        Some(flag) => format!("{flag}\n{context}"),
        None => context.to_string(),
    };

    let messages = vec![
        ChatMessage::system(prompt::evaluator_system_prompt()),
        ChatMessage::user(prompt::build_evaluation_prompt(rubric, &context)),
    ];

    let response = llm.complete(messages, true).await?;
    let mut result = prompt::parse_evaluation_response(&response)?;

    let reported = (result.overall_score, result.final_grade);
    grading::aggregate(&mut result, scale);
    if (reported.0 - result.overall_score).abs() > 0.5 {
        debug!(
            reported = reported.0,
            recomputed = result.overall_score,
            "model-reported overall score disagreed with the recomputed mean"
        );
    }

    Ok(result)
}
