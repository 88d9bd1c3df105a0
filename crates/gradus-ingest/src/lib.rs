//! Content acquisition for the Gradus grader.
//!
//! Turns a project reference (a hosted repository URL or an uploaded zip
//! archive) into a filtered, normalized set of text files:
//!
//! - [`source`] — reference parsing and the closed set of source strategies
//! - [`github`] / [`cdn`] / [`archive`] — the three listing/fetching backends
//! - [`probe`] — ordered ref-candidate probing with outcome classification
//! - [`filter`] — ignore rules, extension allow-list, and the security flag
//! - [`normalize`] — binary-format normalization (notebooks, PDF, Office XML)
//! - [`fetch`] — bounded-concurrency fetching with per-file failure absorption

pub mod archive;
pub mod cdn;
pub mod fetch;
pub mod filter;
pub mod github;
pub mod normalize;
pub mod probe;
pub mod source;

mod notebook;
mod office;
mod pdf;

use gradus_core::{GradusError, IngestConfig, NormalizedFile, Result};
use tracing::info;

pub use source::{ProjectSource, RepoRef, SourceStrategy};

/// A fully ingested project, ready for evaluation.
#[derive(Debug, Clone)]
pub struct IngestedProject {
    /// Project name (repository name, or archive name without `.zip`).
    pub name: String,
    /// The ref the listing resolved to, for hosted sources.
    pub resolved_ref: Option<String>,
    /// Normalized files in listing order; paths are unique.
    pub files: Vec<NormalizedFile>,
    /// Security warning raised by the filter stage, forwarded verbatim to
    /// the evaluator.
    pub security_flag: Option<String>,
}

/// Run the full ingestion pipeline for one source.
///
/// Lists candidates, applies the shared filter stage, then fetches and
/// normalizes the survivors concurrently. Per-file failures are logged and
/// dropped; an empty result set is an error, because nothing downstream can
/// grade an empty project.
///
/// # Errors
///
/// Propagates listing failures ([`GradusError::RepoNotFound`],
/// [`GradusError::NoResolvableRef`], [`GradusError::RateLimited`],
/// [`GradusError::InvalidArchive`], ...) and returns
/// [`GradusError::NoRelevantFiles`] when filtering or fetching leaves
/// nothing usable.
pub async fn ingest(strategy: SourceStrategy, config: &IngestConfig) -> Result<IngestedProject> {
    let mut source = ProjectSource::from_strategy(strategy, config)?;

    let listed = source.list().await?;
    info!(entries = listed.len(), project = source.project_name(), "listed source entries");

    let outcome = filter::apply(listed, source.subpath(), &config.ignore_patterns);
    if outcome.kept.is_empty() {
        let subpath = source.subpath();
        let detail = if subpath.is_empty() {
            "no files with evaluation-relevant extensions (.py, .ipynb, .md, config, documents) were found".to_string()
        } else {
            format!(
                "no files with evaluation-relevant extensions were found under '{subpath}'"
            )
        };
        return Err(GradusError::NoRelevantFiles(detail));
    }
    info!(kept = outcome.kept.len(), "filtered candidate files");

    let candidate_count = outcome.kept.len();
    let files = fetch::fetch_all(&source, outcome.kept, config.fetch_concurrency).await;
    if files.is_empty() {
        return Err(GradusError::NoRelevantFiles(format!(
            "all {candidate_count} candidate files failed to fetch or normalize"
        )));
    }

    Ok(IngestedProject {
        name: source.project_name().to_string(),
        resolved_ref: source.resolved_ref().map(str::to_string),
        files,
        security_flag: outcome.security_flag,
    })
}
