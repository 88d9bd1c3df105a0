//! Anonymous listing and content retrieval through the jsDelivr mirror.
//!
//! Without a credential there is no reliable way to ask GitHub for the
//! default branch, so the lister probes an ordered candidate list of ref
//! names against jsDelivr's flat-listing endpoint: the explicit ref when the
//! URL names one, otherwise a best-effort default discovered from the
//! unauthenticated metadata endpoint, then `main` and `master`. Rate
//! limiting is the single most common failure on this path; the probe stops
//! at the first 429 and the resulting error recommends a token.

use std::time::Duration;

use gradus_core::{CandidateFile, GradusError, IngestConfig, Result};
use serde::Deserialize;
use tracing::debug;

use crate::probe::{probe_candidates, ProbeOutcome};
use crate::source::RepoRef;

const FALLBACK_REFS: &[&str] = &["main", "master"];

/// jsDelivr backend for the anonymous strategy.
pub struct CdnLister {
    http: reqwest::Client,
    repo: RepoRef,
    resolved_ref: Option<String>,
}

#[derive(Deserialize)]
struct FlatListing {
    files: Vec<FlatFile>,
}

#[derive(Deserialize)]
struct FlatFile {
    name: String,
}

impl CdnLister {
    /// Create a backend bound to one repository.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::UpstreamService`] if the HTTP client cannot be
    /// built.
    pub fn new(repo: RepoRef, config: &IngestConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GradusError::UpstreamService(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            repo,
            resolved_ref: None,
        })
    }

    /// The repository this backend reads.
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// The ref the probe resolved to, once [`CdnLister::list`] ran.
    pub fn resolved_ref(&self) -> Option<&str> {
        self.resolved_ref.as_deref()
    }

    /// Probe candidate refs and return the flat file listing of the first
    /// one that resolves.
    ///
    /// # Errors
    ///
    /// [`GradusError::RateLimited`] on the first 429,
    /// [`GradusError::NoResolvableRef`] when every candidate 404s, or
    /// [`GradusError::UpstreamService`] for other failures.
    pub async fn list(&mut self) -> Result<Vec<CandidateFile>> {
        let candidates = self.candidate_refs().await;
        let slug = self.repo.slug();

        let http = self.http.clone();
        let (owner, project) = (self.repo.owner.clone(), self.repo.project.clone());
        let (resolved, paths) = probe_candidates(&slug, &candidates, |candidate| {
            let http = http.clone();
            let owner = owner.clone();
            let project = project.clone();
            async move { probe_flat_listing(&http, &owner, &project, &candidate).await }
        })
        .await?;

        self.resolved_ref = Some(resolved);
        Ok(paths
            .into_iter()
            .map(|path| CandidateFile { path, handle: None })
            .collect())
    }

    /// Fetch one file's raw bytes from the CDN by path.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::UpstreamService`] on network failures or
    /// non-success statuses; the fetcher absorbs these per file. A 429 is
    /// still surfaced distinctly as [`GradusError::RateLimited`].
    pub async fn fetch(&self, candidate: &CandidateFile) -> Result<Vec<u8>> {
        let git_ref = self.resolved_ref.as_deref().ok_or_else(|| {
            GradusError::UpstreamService("CDN fetch attempted before the listing resolved a ref".into())
        })?;

        let url = format!(
            "https://cdn.jsdelivr.net/gh/{}/{}@{git_ref}/{}",
            self.repo.owner, self.repo.project, candidate.path
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("CDN request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GradusError::RateLimited {
                service: "jsDelivr".into(),
            });
        }
        if !status.is_success() {
            return Err(GradusError::UpstreamService(format!(
                "CDN fetch for '{}' failed with status {status}",
                candidate.path
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("failed to read CDN body: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Ordered candidate refs: the explicit ref when the URL names one,
    /// otherwise discovered default + common fallback names, deduplicated.
    async fn candidate_refs(&self) -> Vec<String> {
        if let Some(explicit) = &self.repo.git_ref {
            return vec![explicit.clone()];
        }

        let mut candidates = Vec::new();
        if let Some(discovered) = self.discover_default_branch().await {
            candidates.push(discovered);
        }
        for fallback in FALLBACK_REFS {
            if !candidates.iter().any(|c| c == fallback) {
                candidates.push((*fallback).to_string());
            }
        }
        candidates
    }

    /// Best-effort default-branch discovery from the unauthenticated GitHub
    /// metadata endpoint. Any failure (including its own rate limiting)
    /// silently yields `None`; the fallback names cover that case.
    async fn discover_default_branch(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Metadata {
            default_branch: Option<String>,
        }

        let url = format!(
            "https://api.github.com/repos/{}/{}",
            self.repo.owner, self.repo.project
        );
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "gradus")
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            debug!(
                status = response.status().as_u16(),
                "default-branch discovery unavailable, falling back to common names"
            );
            return None;
        }
        response.json::<Metadata>().await.ok()?.default_branch
    }
}

/// Probe one ref against the flat-listing endpoint and classify the result.
async fn probe_flat_listing(
    http: &reqwest::Client,
    owner: &str,
    project: &str,
    git_ref: &str,
) -> ProbeOutcome<Vec<String>> {
    let url = format!("https://data.jsdelivr.com/v1/package/gh/{owner}/{project}@{git_ref}/flat");
    let response = match http.get(&url).send().await {
        Ok(response) => response,
        Err(err) => return ProbeOutcome::Other(format!("jsDelivr request failed: {err}")),
    };

    match response.status().as_u16() {
        200 => match response.json::<FlatListing>().await {
            Ok(listing) => ProbeOutcome::Success(
                listing
                    .files
                    .into_iter()
                    .map(|f| f.name.trim_start_matches('/').to_string())
                    .collect(),
            ),
            Err(err) => ProbeOutcome::Other(format!("jsDelivr listing did not parse: {err}")),
        },
        404 => ProbeOutcome::NotFound,
        429 => ProbeOutcome::RateLimited {
            service: "jsDelivr".into(),
        },
        status => ProbeOutcome::Other(format!("jsDelivr returned status {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_listing_parses_and_strips_leading_slash() {
        let json = r#"{"default": "/README.md", "files": [
            {"name": "/README.md", "hash": "h", "size": 10},
            {"name": "/src/app.py", "hash": "h2", "size": 20}
        ]}"#;
        let listing: FlatListing = serde_json::from_str(json).unwrap();
        let paths: Vec<String> = listing
            .files
            .into_iter()
            .map(|f| f.name.trim_start_matches('/').to_string())
            .collect();
        assert_eq!(paths, vec!["README.md", "src/app.py"]);
    }

    #[tokio::test]
    async fn explicit_ref_is_the_only_candidate() {
        let repo = RepoRef::parse("https://github.com/o/p/tree/dev").unwrap();
        let lister = CdnLister::new(repo, &IngestConfig::default()).unwrap();
        let candidates = lister.candidate_refs().await;
        assert_eq!(candidates, vec!["dev".to_string()]);
    }

    #[tokio::test]
    async fn fetch_before_list_is_an_error() {
        let repo = RepoRef::parse("https://github.com/o/p").unwrap();
        let lister = CdnLister::new(repo, &IngestConfig::default()).unwrap();
        let candidate = CandidateFile {
            path: "a.py".into(),
            handle: None,
        };
        let err = lister.fetch(&candidate).await.unwrap_err();
        assert!(matches!(err, GradusError::UpstreamService(_)));
    }
}
