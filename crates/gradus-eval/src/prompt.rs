use gradus_core::{Digest, EvaluationItem, EvaluationResult, GradusError, NormalizedFile, Result};
use serde::Deserialize;
use tracing::warn;

use crate::batch::wrap_file;

const EVALUATOR_SYSTEM_PROMPT: &str = "\
You are a senior teaching assistant for a software engineering program. Your \
job is to grade a student project against the provided rubric. Be rigorous \
and fair, but your primary goal is educational.

Rules:
- Mentor tone: do not just point out problems; explain why they matter from a \
software-engineering perspective and how to improve, citing concepts a \
student at this level should know
- Analyze the directory structure using the complete file list and mention \
significant deviations from common conventions
- Pay special attention to any CRITICAL SECURITY ALERT in the project context
- Apply the rubric criterion by criterion, using the exact criterion names; \
you are grading a student, not a senior engineer; working, reasonably \
organized code that meets the requirements deserves a good score
- Assign a score from 0 to 100 for EVERY criterion
- Give specific, well-grounded markdown feedback per criterion, citing file \
names or code fragments; acknowledge strengths as well as weaknesses

Respond with a JSON object:
{
  \"overallScore\": 0-100,
  \"summary\": \"Detailed, objective summary of the overall evaluation\",
  \"professionalismSummary\": \"Analysis of professionalism: best practices, folder structure, security\",
  \"report\": [
    {
      \"criterion\": \"Exact criterion name from the rubric\",
      \"score\": 0-100,
      \"feedback\": \"Detailed, constructive markdown feedback\"
    }
  ],
  \"finalGrade\": number
}

Respond ONLY with the JSON object: no text before or after it, no markdown \
code fences.";

const SUMMARIZER_SYSTEM_PROMPT: &str = "\
You summarize source files so a later, separate stage can review the project. \
Describe factually what each file contains and how the pieces fit together: \
languages, frameworks, structure, and notable implementation details.

Rules:
- Describe, do not judge: no opinions on quality, no scores, no grades
- Do not reference any rubric or evaluation criteria
- Keep file paths exact so the later stage can cite them";

const TRIAGE_SYSTEM_PROMPT: &str = "\
You select which files from a large project are most worth reading for a \
grading review. Prioritize implementation source and primary documentation \
over generated artifacts, peripheral configuration, and boilerplate.

Respond with a JSON object:
{ \"paths\": [\"path/one.py\", \"path/two.md\"] }

Every path must be copied exactly from the provided list. Respond ONLY with \
the JSON object.";

/// System prompt for the terminal evaluation call.
pub fn evaluator_system_prompt() -> String {
    EVALUATOR_SYSTEM_PROMPT.to_string()
}

/// System prompt for per-batch summarization.
pub fn summarizer_system_prompt() -> String {
    SUMMARIZER_SYSTEM_PROMPT.to_string()
}

/// System prompt for relevance triage.
pub fn triage_system_prompt() -> String {
    TRIAGE_SYSTEM_PROMPT.to_string()
}

/// Build the user prompt for the terminal evaluation call.
///
/// # Examples
///
/// ```
/// use gradus_eval::prompt::build_evaluation_prompt;
///
/// let prompt = build_evaluation_prompt("## 1. Tests (100%)", "the project context");
/// assert!(prompt.contains("## 1. Tests (100%)"));
/// assert!(prompt.contains("the project context"));
/// ```
pub fn build_evaluation_prompt(rubric: &str, context: &str) -> String {
    format!(
        "--- BEGIN EVALUATION RUBRIC ---\n{rubric}\n--- END EVALUATION RUBRIC ---\n\n\
         --- BEGIN PROJECT CONTEXT (FILES AND CONTENT) ---\n{context}\n--- END PROJECT CONTEXT ---\n\n\
         Now provide your complete evaluation in the requested JSON format."
    )
}

/// Build the user prompt for one batch summarization.
pub fn build_summary_prompt(batch_ordinal: usize, batch_count: usize, batch_text: &str) -> String {
    format!(
        "This is batch {batch_ordinal} of {batch_count} from one student project. \
         Describe its contents.\n\n{batch_text}"
    )
}

/// Build the user prompt for relevance triage.
pub fn build_triage_prompt(paths: &[String], rubric: &str, max_paths: usize) -> String {
    format!(
        "Select at most {max_paths} paths from this project that best support grading \
         it against the rubric below.\n\n\
         --- BEGIN FILE LIST ---\n{}\n--- END FILE LIST ---\n\n\
         --- BEGIN RUBRIC ---\n{rubric}\n--- END RUBRIC ---",
        paths.join("\n")
    )
}

/// Assemble the direct evaluation context: the complete path list followed
/// by every file's wrapped content.
pub fn build_direct_context(files: &[NormalizedFile]) -> String {
    let mut context = format!("Complete list of project files:\n{}\n", path_listing(files));
    context.push_str("\n--- BEGIN FILE CONTENTS ---\n");
    for file in files {
        context.push_str(&wrap_file(file));
    }
    context.push_str("--- END FILE CONTENTS ---\n");
    context
}

/// Assemble the summarized evaluation context: the complete path list
/// followed by each batch digest in batch order.
pub fn build_digest_context(files: &[NormalizedFile], digests: &[Digest]) -> String {
    let mut context = format!("Complete list of project files:\n{}\n", path_listing(files));
    context.push_str(&format!(
        "\nThe project content was summarized in {} batches by a separate, \
         non-judgmental stage. The summaries follow:\n",
        digests.len()
    ));
    for digest in digests {
        let ordinal = digest.batch_index + 1;
        context.push_str(&format!(
            "\n--- BATCH {ordinal} SUMMARY ---\n{}\n--- END BATCH {ordinal} SUMMARY ---\n",
            digest.text
        ));
    }
    context
}

fn path_listing(files: &[NormalizedFile]) -> String {
    files
        .iter()
        .map(|f| f.path.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locate the outermost balanced JSON object in a raw response.
///
/// Generation is not contractually guaranteed to omit stray text around the
/// JSON, so the parsers scan for the first `{` and return the slice up to
/// its matching close brace, respecting string literals and escapes.
///
/// # Examples
///
/// ```
/// use gradus_eval::prompt::extract_json_object;
///
/// let raw = "Sure! Here you go: {\"a\": {\"b\": 1}} hope that helps";
/// assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
/// assert_eq!(extract_json_object("no json here"), None);
/// ```
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    overall_score: Option<f64>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    professionalism_summary: String,
    report: Vec<RawItem>,
    final_grade: Option<f64>,
}

#[derive(Deserialize)]
struct RawItem {
    criterion: String,
    score: serde_json::Value,
    #[serde(default)]
    feedback: String,
}

/// Parse the terminal evaluation response strictly.
///
/// The returned result still carries the model-reported aggregate numbers;
/// the caller recomputes both before anything user-visible sees them.
///
/// # Errors
///
/// Returns [`GradusError::MalformedLlmResponse`] when no balanced JSON
/// object is present, the object does not match the schema, or no usable
/// per-criterion entry survives validation. This is a hard failure: a
/// silently wrong grade is worse than a visible error.
pub fn parse_evaluation_response(response: &str) -> Result<EvaluationResult> {
    let cleaned = strip_code_fences(response);
    let json = extract_json_object(cleaned).ok_or_else(|| {
        GradusError::MalformedLlmResponse("response contains no JSON object".into())
    })?;

    let raw: RawEvaluation = serde_json::from_str(json)
        .map_err(|e| GradusError::MalformedLlmResponse(format!("schema mismatch: {e}")))?;

    let mut report = Vec::new();
    for item in raw.report {
        let Some(score) = numeric_score(&item.score) else {
            warn!(criterion = %item.criterion, "discarding entry with non-numeric score");
            continue;
        };
        report.push(EvaluationItem {
            criterion: item.criterion,
            score: score.clamp(0.0, 100.0),
            feedback: item.feedback,
        });
    }

    if report.is_empty() {
        return Err(GradusError::MalformedLlmResponse(
            "response contained no usable per-criterion entries".into(),
        ));
    }

    Ok(EvaluationResult {
        overall_score: raw.overall_score.unwrap_or(0.0),
        summary: raw.summary,
        professionalism_summary: raw.professionalism_summary,
        report,
        final_grade: raw.final_grade.unwrap_or(0.0),
    })
}

#[derive(Deserialize)]
struct TriageResponse {
    paths: Vec<String>,
}

/// Parse a triage response leniently.
///
/// Returns `None` on any shape mismatch; the caller falls back to a
/// deterministic truncation instead of failing the run.
pub fn parse_triage_response(response: &str) -> Option<Vec<String>> {
    let cleaned = strip_code_fences(response);
    let json = extract_json_object(cleaned).unwrap_or(cleaned);
    serde_json::from_str::<TriageResponse>(json)
        .ok()
        .map(|r| r.paths)
}

fn numeric_score(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompts_carry_key_instructions() {
        assert!(evaluator_system_prompt().contains("EVERY criterion"));
        assert!(summarizer_system_prompt().contains("do not judge"));
        assert!(triage_system_prompt().contains("copied exactly"));
    }

    #[test]
    fn evaluation_prompt_delimits_rubric_and_context() {
        let prompt = build_evaluation_prompt("RUBRIC-TEXT", "CONTEXT-TEXT");
        assert!(prompt.contains("--- BEGIN EVALUATION RUBRIC ---\nRUBRIC-TEXT"));
        assert!(prompt.contains("CONTEXT-TEXT\n--- END PROJECT CONTEXT ---"));
    }

    #[test]
    fn direct_context_lists_paths_and_contents() {
        let files = vec![
            NormalizedFile { path: "a.py".into(), text: "alpha".into() },
            NormalizedFile { path: "b.md".into(), text: "beta".into() },
        ];
        let context = build_direct_context(&files);
        assert!(context.starts_with("Complete list of project files:\na.py\nb.md\n"));
        assert!(context.contains("--- FILE: a.py ---"));
        assert!(context.contains("beta"));
    }

    #[test]
    fn digest_context_orders_by_batch_index() {
        let files = vec![NormalizedFile { path: "a.py".into(), text: String::new() }];
        let digests = vec![
            Digest { batch_index: 0, text: "first".into() },
            Digest { batch_index: 1, text: "second".into() },
        ];
        let context = build_digest_context(&files, &digests);
        let first = context.find("BATCH 1 SUMMARY").unwrap();
        let second = context.find("BATCH 2 SUMMARY").unwrap();
        assert!(first < second);
        assert!(context.contains("2 batches"));
    }

    #[test]
    fn extract_json_skips_surrounding_prose() {
        let raw = "Here is the result:\n{\"paths\": [\"a\"]}\nLet me know!";
        assert_eq!(extract_json_object(raw), Some("{\"paths\": [\"a\"]}"));
    }

    #[test]
    fn extract_json_handles_nested_and_string_braces() {
        let raw = r#"{"a": "}{", "b": {"c": "\"}"}} trailing"#;
        let extracted = extract_json_object(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(extracted).unwrap();
        assert_eq!(value["a"], "}{");
    }

    #[test]
    fn extract_json_rejects_unterminated_object() {
        assert_eq!(extract_json_object("{\"a\": 1"), None);
    }

    #[test]
    fn parse_valid_evaluation() {
        let json = r#"{
            "overallScore": 83,
            "summary": "good",
            "professionalismSummary": "tidy",
            "report": [
                {"criterion": "Structure", "score": 90, "feedback": "solid"},
                {"criterion": "Tests", "score": 76, "feedback": "thin"}
            ],
            "finalGrade": 6.0
        }"#;
        let result = parse_evaluation_response(json).unwrap();
        assert_eq!(result.report.len(), 2);
        assert_eq!(result.report[0].criterion, "Structure");
        assert_eq!(result.overall_score, 83.0);
    }

    #[test]
    fn parse_evaluation_with_fences_and_prose() {
        let raw = "```json\n{\"report\": [{\"criterion\": \"C\", \"score\": 55, \"feedback\": \"f\"}]}\n```";
        let result = parse_evaluation_response(raw).unwrap();
        assert_eq!(result.report.len(), 1);
        assert_eq!(result.report[0].score, 55.0);
    }

    #[test]
    fn parse_evaluation_accepts_string_scores_and_clamps() {
        let json = r#"{"report": [
            {"criterion": "A", "score": "88", "feedback": ""},
            {"criterion": "B", "score": 150, "feedback": ""}
        ]}"#;
        let result = parse_evaluation_response(json).unwrap();
        assert_eq!(result.report[0].score, 88.0);
        assert_eq!(result.report[1].score, 100.0);
    }

    #[test]
    fn parse_evaluation_discards_non_numeric_scores() {
        let json = r#"{"report": [
            {"criterion": "A", "score": "excellent", "feedback": ""},
            {"criterion": "B", "score": 70, "feedback": ""}
        ]}"#;
        let result = parse_evaluation_response(json).unwrap();
        assert_eq!(result.report.len(), 1);
        assert_eq!(result.report[0].criterion, "B");
    }

    #[test]
    fn parse_evaluation_rejects_prose() {
        let err = parse_evaluation_response("I cannot evaluate this project.").unwrap_err();
        assert!(matches!(err, GradusError::MalformedLlmResponse(_)));
    }

    #[test]
    fn parse_evaluation_rejects_empty_report() {
        let err = parse_evaluation_response(r#"{"report": []}"#).unwrap_err();
        assert!(matches!(err, GradusError::MalformedLlmResponse(_)));
    }

    #[test]
    fn parse_triage_accepts_valid_paths_object() {
        let paths = parse_triage_response(r#"{"paths": ["a.py", "b.md"]}"#).unwrap();
        assert_eq!(paths, vec!["a.py", "b.md"]);
    }

    #[test]
    fn parse_triage_tolerates_prose_and_fences() {
        let raw = "```json\n{\"paths\": [\"x.py\"]}\n```";
        assert_eq!(parse_triage_response(raw).unwrap(), vec!["x.py"]);
    }

    #[test]
    fn parse_triage_returns_none_on_garbage() {
        assert!(parse_triage_response("no idea").is_none());
        assert!(parse_triage_response(r#"{"files": []}"#).is_none());
    }
}
