//! LLM-assisted relevance triage.
//!
//! Invoked only when the filtered file count exceeds the configured cap.
//! The LLM sees paths and the rubric, never content; its selection is
//! validated against the input set, and any malformed response falls back
//! deterministically to the first `max_files` paths in listing order.
//! Triage failure must never abort an evaluation.

use std::collections::HashSet;

use gradus_core::NormalizedFile;
use tracing::{info, warn};

use crate::llm::{ChatMessage, Completion};
use crate::prompt;

/// Down-select `files` to at most `max_files`, preferring the LLM's
/// selection and falling back to listing-order truncation.
///
/// The returned list preserves listing order and never contains a path that
/// was absent from the input.
pub async fn triage<C>(
    llm: &C,
    files: Vec<NormalizedFile>,
    rubric: &str,
    max_files: usize,
) -> Vec<NormalizedFile>
where
    C: Completion + ?Sized,
{
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
    let messages = vec![
        ChatMessage::system(prompt::triage_system_prompt()),
        ChatMessage::user(prompt::build_triage_prompt(&paths, rubric, max_files)),
    ];

    let selected = match llm.complete(messages, true).await {
        Ok(response) => prompt::parse_triage_response(&response),
        Err(err) => {
            warn!(%err, "triage call failed");
            None
        }
    };

    let Some(selected) = selected else {
        warn!(
            kept = max_files,
            "triage response unusable, falling back to the first files in listing order"
        );
        return truncate(files, max_files);
    };

    let known: HashSet<&str> = paths.iter().map(String::as_str).collect();
    let mut wanted: HashSet<String> = HashSet::new();
    for path in selected {
        if known.contains(path.as_str()) {
            wanted.insert(path);
        } else {
            warn!(path = %path, "triage returned a path not present in the listing, discarding");
        }
    }

    if wanted.is_empty() {
        warn!(
            kept = max_files,
            "triage selected nothing usable, falling back to the first files in listing order"
        );
        return truncate(files, max_files);
    }

    // Walk the original list so listing order survives the selection.
    let mut kept: Vec<NormalizedFile> = files
        .into_iter()
        .filter(|f| wanted.contains(&f.path))
        .collect();
    kept.truncate(max_files);
    info!(kept = kept.len(), "triage selected files");
    kept
}

fn truncate(mut files: Vec<NormalizedFile>, max_files: usize) -> Vec<NormalizedFile> {
    files.truncate(max_files);
    files
}
