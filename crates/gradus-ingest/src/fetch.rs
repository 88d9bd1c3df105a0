//! Bounded-concurrency content fetching.

use futures::stream::{self, StreamExt};
use gradus_core::{CandidateFile, NormalizedFile};
use tracing::warn;

use crate::normalize::normalize;
use crate::source::ProjectSource;

/// Fetch and normalize every candidate, at most `concurrency` in flight.
///
/// Each task fills an independent result slot; slots are merged back into
/// listing order afterwards, so downstream batching sees a deterministic
/// sequence regardless of completion order. A failed fetch logs a warning
/// and drops that file; a single flaky blob must not abort the run.
pub async fn fetch_all(
    source: &ProjectSource,
    candidates: Vec<CandidateFile>,
    concurrency: usize,
) -> Vec<NormalizedFile> {
    let slots: Vec<(usize, Option<NormalizedFile>)> = stream::iter(
        candidates.into_iter().enumerate().map(|(index, candidate)| async move {
            match source.fetch_raw(&candidate).await {
                Ok(bytes) => {
                    let text = normalize(&bytes, &candidate.path);
                    (index, Some(NormalizedFile {
                        path: candidate.path,
                        text,
                    }))
                }
                Err(err) => {
                    warn!(path = %candidate.path, %err, "skipping file: fetch failed");
                    (index, None)
                }
            }
        }),
    )
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let mut slots = slots;
    slots.sort_by_key(|(index, _)| *index);
    slots.into_iter().filter_map(|(_, file)| file).collect()
}
