//! Ordered ref-candidate probing with outcome classification.
//!
//! The anonymous strategy cannot ask GitHub for the default branch reliably,
//! so it walks an ordered list of candidate ref names against the listing
//! endpoint. Each attempt is classified; only a clean not-found advances to
//! the next candidate. A rate-limit signal stops the walk immediately so the
//! remaining quota is not burned on candidates that would fail the same way.

use std::future::Future;

use gradus_core::{GradusError, Result};
use tracing::debug;

/// Classified result of probing one candidate ref.
#[derive(Debug)]
pub enum ProbeOutcome<T> {
    /// The candidate resolved; carries the listing it produced.
    Success(T),
    /// The candidate does not exist; try the next one.
    NotFound,
    /// The service is rate limiting us; stop probing immediately.
    RateLimited {
        /// Name of the rate-limiting service, for the user-facing error.
        service: String,
    },
    /// Some other failure (network, 5xx); stop probing and surface it.
    Other(String),
}

/// Probe an ordered candidate list, returning the first ref that resolves
/// together with its payload.
///
/// # Errors
///
/// - [`GradusError::RateLimited`] as soon as any attempt reports it
/// - [`GradusError::UpstreamService`] for any other non-not-found failure
/// - [`GradusError::NoResolvableRef`] when every candidate was tried; the
///   error names each attempted ref so the user can self-correct
pub async fn probe_candidates<T, F, Fut>(
    repo_slug: &str,
    candidates: &[String],
    mut probe: F,
) -> Result<(String, T)>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ProbeOutcome<T>>,
{
    for candidate in candidates {
        debug!(candidate, repo = repo_slug, "probing ref");
        match probe(candidate.clone()).await {
            ProbeOutcome::Success(value) => {
                debug!(candidate, repo = repo_slug, "ref resolved");
                return Ok((candidate.clone(), value));
            }
            ProbeOutcome::NotFound => {
                debug!(candidate, repo = repo_slug, "ref not found, trying next");
            }
            ProbeOutcome::RateLimited { service } => {
                return Err(GradusError::RateLimited { service });
            }
            ProbeOutcome::Other(detail) => {
                return Err(GradusError::UpstreamService(detail));
            }
        }
    }

    Err(GradusError::NoResolvableRef {
        repo: repo_slug.to_string(),
        attempted: candidates.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn first_success_wins() {
        let (resolved, value) =
            probe_candidates("o/p", &candidates(&["main", "master"]), |c| async move {
                ProbeOutcome::Success(format!("listing-for-{c}"))
            })
            .await
            .unwrap();
        assert_eq!(resolved, "main");
        assert_eq!(value, "listing-for-main");
    }

    #[tokio::test]
    async fn not_found_advances_to_next_candidate() {
        let (resolved, _) =
            probe_candidates("o/p", &candidates(&["main", "master"]), |c| async move {
                if c == "master" {
                    ProbeOutcome::Success(())
                } else {
                    ProbeOutcome::NotFound
                }
            })
            .await
            .unwrap();
        assert_eq!(resolved, "master");
    }

    #[tokio::test]
    async fn rate_limit_stops_probing_immediately() {
        let mut attempts = 0;
        let err = probe_candidates("o/p", &candidates(&["a", "b", "c"]), |_| {
            attempts += 1;
            async { ProbeOutcome::<()>::RateLimited { service: "jsDelivr".into() } }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GradusError::RateLimited { .. }));
        assert_eq!(attempts, 1, "must not keep burning quota after a 429");
    }

    #[tokio::test]
    async fn other_error_is_surfaced_not_skipped() {
        let err = probe_candidates("o/p", &candidates(&["a", "b"]), |_| async {
            ProbeOutcome::<()>::Other("connection reset".into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GradusError::UpstreamService(_)));
    }

    #[tokio::test]
    async fn exhaustion_names_every_candidate() {
        let err = probe_candidates("o/p", &candidates(&["main", "master"]), |_| async {
            ProbeOutcome::<()>::NotFound
        })
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("main, master"));
        assert!(msg.contains("o/p"));
    }
}
