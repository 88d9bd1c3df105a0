use std::collections::HashSet;

use gradus_core::CandidateFile;
use tracing::{debug, warn};

/// File extensions that are relevant to evaluation: source code, structured
/// configuration, markup, and the structured-document formats the
/// normalizer can read.
pub const RELEVANT_EXTENSIONS: &[&str] = &[
    ".py", ".ipynb", ".yml", ".yaml", ".md", ".txt", ".json", ".cfg", ".toml", ".ini", ".pdf",
    ".docx", ".pptx",
];

/// Path segments rejected anywhere in a path: version-control metadata,
/// dependency caches, and editor state.
const IGNORED_SEGMENTS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ipynb_checkpoints",
    "site-packages",
    ".idea",
    ".vscode",
];

/// File names rejected outright (OS artifacts).
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Warning raised when a credential file shows up in a listing. The file
/// itself is never fetched; the warning travels into the evaluator input so
/// the finding can be penalized.
const SECURITY_FLAG_HEADER: &str = "--- CRITICAL SECURITY ALERT ---";

/// Result of the shared filter stage.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Candidates that survived, in listing order.
    pub kept: Vec<CandidateFile>,
    /// Security warning, when a `.env` entry was found among eligible paths.
    pub security_flag: Option<String>,
}

/// Apply the shared filter stage to a raw listing.
///
/// Order of operations: subpath restriction, built-in ignore rules plus
/// caller-supplied glob patterns, `.env` detection, extension allow-list.
/// The `.env` check runs before the allow-list because `.env` carries no
/// allow-listed extension — it must raise the flag even though the entry
/// itself is dropped.
///
/// # Examples
///
/// ```
/// use gradus_core::CandidateFile;
/// use gradus_ingest::filter::apply;
///
/// let listing = vec![
///     CandidateFile { path: "src/train.py".into(), handle: None },
///     CandidateFile { path: "node_modules/x/y.json".into(), handle: None },
///     CandidateFile { path: "config/.env".into(), handle: None },
///     CandidateFile { path: "model.bin".into(), handle: None },
/// ];
/// let outcome = apply(listing, "", &[]);
/// assert_eq!(outcome.kept.len(), 1);
/// assert_eq!(outcome.kept[0].path, "src/train.py");
/// assert!(outcome.security_flag.unwrap().contains("config/.env"));
/// ```
pub fn apply(
    candidates: Vec<CandidateFile>,
    subpath: &str,
    extra_ignores: &[String],
) -> FilterOutcome {
    let extra: Vec<glob::Pattern> = extra_ignores
        .iter()
        .filter_map(|raw| match glob::Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!(pattern = %raw, %err, "ignoring invalid ignore pattern");
                None
            }
        })
        .collect();

    let mut kept = Vec::new();
    let mut security_flag = None;
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in candidates {
        if !within_subpath(&candidate.path, subpath) {
            continue;
        }
        // Archives may carry duplicate entry names; paths must be unique
        // within a run.
        if !seen.insert(candidate.path.clone()) {
            warn!(path = %candidate.path, "duplicate path in listing, keeping first occurrence");
            continue;
        }
        if is_ignored(&candidate.path) {
            debug!(path = %candidate.path, "excluded by ignore rules");
            continue;
        }
        if extra.iter().any(|p| p.matches(&candidate.path)) {
            debug!(path = %candidate.path, "excluded by configured pattern");
            continue;
        }

        if file_name(&candidate.path) == ".env" {
            if security_flag.is_none() {
                security_flag = Some(security_flag_text(&candidate.path));
            }
            warn!(path = %candidate.path, "credential file detected in listing");
            continue;
        }

        if !has_relevant_extension(&candidate.path) {
            debug!(path = %candidate.path, "excluded: extension not relevant");
            continue;
        }

        kept.push(candidate);
    }

    FilterOutcome {
        kept,
        security_flag,
    }
}

fn within_subpath(path: &str, subpath: &str) -> bool {
    if subpath.is_empty() {
        return true;
    }
    path == subpath || path.starts_with(&format!("{subpath}/"))
}

fn is_ignored(path: &str) -> bool {
    if IGNORED_FILES.contains(&file_name(path)) {
        return true;
    }
    path.split('/')
        .any(|segment| IGNORED_SEGMENTS.contains(&segment))
}

fn has_relevant_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    RELEVANT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn security_flag_text(path: &str) -> String {
    format!(
        "{SECURITY_FLAG_HEADER}\n\
         A `.env` file was detected in the submitted project (`{path}`). Committing \
         environment files exposes secrets and credentials; this must be called out \
         in the feedback and penalized under the best-practices criterion.\n\
         -------------------------------"
    )
}
