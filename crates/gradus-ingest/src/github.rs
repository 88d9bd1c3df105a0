//! Authenticated GitHub listing and content retrieval.
//!
//! Repository metadata goes through `octocrab`; the recursive tree and raw
//! blob content use plain `reqwest` calls with the appropriate `Accept`
//! headers, because the raw media type skips the base64 detour entirely.

use std::time::Duration;

use gradus_core::{CandidateFile, GradusError, IngestConfig, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::source::RepoRef;

/// GitHub REST backend for the authenticated strategy.
pub struct GithubLister {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    repo: RepoRef,
    resolved_ref: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

impl GithubLister {
    /// Create a backend bound to one repository and token.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::UpstreamService`] if either HTTP client cannot
    /// be built.
    pub fn new(repo: RepoRef, token: String, config: &IngestConfig) -> Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| {
                GradusError::UpstreamService(format!("failed to create GitHub client: {e}"))
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GradusError::UpstreamService(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            octocrab,
            http,
            token,
            repo,
            resolved_ref: None,
        })
    }

    /// The repository this backend reads.
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// The ref the listing resolved to, once [`GithubLister::list`] ran.
    pub fn resolved_ref(&self) -> Option<&str> {
        self.resolved_ref.as_deref()
    }

    /// List every blob in the repository tree for the resolved ref.
    ///
    /// One metadata call resolves an absent ref to the default branch, then
    /// one recursive tree call returns the whole file list with content
    /// identifiers.
    ///
    /// # Errors
    ///
    /// [`GradusError::RepoNotFound`] (404), [`GradusError::AuthInsufficient`]
    /// (401/403), or [`GradusError::UpstreamService`] for anything else.
    pub async fn list(&mut self) -> Result<Vec<CandidateFile>> {
        let slug = self.repo.slug();

        let metadata = self
            .octocrab
            .repos(&self.repo.owner, &self.repo.project)
            .get()
            .await
            .map_err(|err| classify_octocrab(&slug, err))?;

        let git_ref = match &self.repo.git_ref {
            Some(explicit) => explicit.clone(),
            None => metadata.default_branch.ok_or_else(|| {
                GradusError::UpstreamService(format!(
                    "GitHub reported no default branch for {slug}"
                ))
            })?,
        };
        debug!(repo = %slug, git_ref = %git_ref, "listing repository tree");

        let url = format!(
            "https://api.github.com/repos/{}/{}/git/trees/{}?recursive=1",
            self.repo.owner, self.repo.project, git_ref
        );
        let response = self
            .api_get(&url, "application/vnd.github+json")
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(&slug, status.as_u16(), &body));
        }

        let listing: TreeResponse = response
            .json()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("failed to parse tree: {e}")))?;

        if listing.truncated {
            warn!(repo = %slug, "GitHub truncated the recursive tree listing");
        }

        self.resolved_ref = Some(git_ref);
        Ok(listing
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| CandidateFile {
                path: entry.path,
                handle: Some(entry.sha),
            })
            .collect())
    }

    /// Fetch the raw bytes of one blob by its content identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::UpstreamService`] on network or API failures;
    /// the fetcher absorbs these per file.
    pub async fn fetch(&self, candidate: &CandidateFile) -> Result<Vec<u8>> {
        let sha = candidate.handle.as_deref().ok_or_else(|| {
            GradusError::UpstreamService(format!(
                "no content identifier for '{}'",
                candidate.path
            ))
        })?;

        let url = format!(
            "https://api.github.com/repos/{}/{}/git/blobs/{sha}",
            self.repo.owner, self.repo.project
        );
        let response = self
            .api_get(&url, "application/vnd.github.raw+json")
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GradusError::UpstreamService(format!(
                "GitHub blob fetch for '{}' failed with status {status}",
                candidate.path
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("failed to read blob: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn api_get(&self, url: &str, accept: &str) -> Result<reqwest::Response> {
        self.http
            .get(url)
            .header("Accept", accept)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "gradus")
            .send()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("GitHub request failed: {e}")))
    }
}

fn classify_octocrab(slug: &str, err: octocrab::Error) -> GradusError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            classify_status(slug, source.status_code.as_u16(), &source.message)
        }
        other => GradusError::UpstreamService(format!("GitHub API: {other}")),
    }
}

fn classify_status(slug: &str, status: u16, detail: &str) -> GradusError {
    match status {
        404 => GradusError::RepoNotFound(slug.to_string()),
        401 | 403 => GradusError::AuthInsufficient(slug.to_string()),
        _ => GradusError::UpstreamService(format!("GitHub API error {status}: {detail}")),
    }
}
