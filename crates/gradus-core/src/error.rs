/// Errors that can occur across the Gradus pipeline.
///
/// Each variant wraps a specific failure domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// Variants that commonly reach end users carry their own remediation text,
/// because the most frequent failure on the anonymous path is rate limiting
/// and the fix (supply a token or an explicit ref) is not obvious from a bare
/// status code.
///
/// # Examples
///
/// ```
/// use gradus_core::GradusError;
///
/// let err = GradusError::InvalidReference("not-a-url".into());
/// assert!(err.to_string().contains("not-a-url"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum GradusError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository reference string does not match a recognized shape.
    #[error("invalid repository reference: {0}")]
    InvalidReference(String),

    /// The hosting API reported that the repository does not exist.
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    /// The supplied credential was rejected or lacks access.
    #[error("authorization failed for {0}: check that the token is valid and can read the repository")]
    AuthInsufficient(String),

    /// A rate-limit response from an external service. Probing stops as soon
    /// as this is observed.
    #[error("rate limited by {service}: supply a GitHub token (--github-token or GITHUB_TOKEN) to use the authenticated API, or retry later")]
    RateLimited {
        /// Which external service returned the rate-limit response.
        service: String,
    },

    /// Every candidate ref was probed without success.
    #[error("could not resolve a ref for {}: tried {}. Specify the branch in the URL (e.g. /tree/main) or supply a GitHub token", .repo, .attempted.join(", "))]
    NoResolvableRef {
        /// `owner/project` the probe ran against.
        repo: String,
        /// Every candidate ref name that was attempted, in probe order.
        attempted: Vec<String>,
    },

    /// The uploaded archive could not be opened as a zip container.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Filtering or triage left nothing to evaluate.
    #[error("no relevant files: {0}")]
    NoRelevantFiles(String),

    /// The rubric failed its structural check.
    #[error("invalid rubric: {0}")]
    Rubric(String),

    /// The LLM response could not be parsed into the required structure.
    #[error("malformed LLM response: {0}")]
    MalformedLlmResponse(String),

    /// Network failure or 5xx from an external service.
    #[error("upstream service error: {0}")]
    UpstreamService(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GradusError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn rate_limited_recommends_a_token() {
        let err = GradusError::RateLimited {
            service: "jsDelivr".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("jsDelivr"));
        assert!(msg.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn no_resolvable_ref_names_every_candidate() {
        let err = GradusError::NoResolvableRef {
            repo: "octocat/hello".into(),
            attempted: vec!["main".into(), "master".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("main, master"));
        assert!(msg.contains("octocat/hello"));
        assert!(msg.contains("token"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = GradusError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }
}
