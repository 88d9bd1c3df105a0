//! Concurrent per-batch summarization.

use futures::stream::{self, StreamExt};
use gradus_core::{Batch, Digest};
use tracing::warn;

use crate::batch::wrap_file;
use crate::llm::{ChatMessage, Completion};
use crate::prompt;

/// Summarize every batch, at most `concurrency` calls in flight.
///
/// Calls are independent and may complete out of order; digests are
/// reassembled by batch index before they are returned. A failed batch
/// yields a placeholder digest instead of failing the run; it stays in the
/// output so the evaluator can see that coverage was incomplete.
pub async fn summarize_batches<C>(llm: &C, batches: &[Batch], concurrency: usize) -> Vec<Digest>
where
    C: Completion + ?Sized,
{
    let batch_count = batches.len();

    let mut digests: Vec<Digest> = stream::iter(batches.iter().map(|batch| async move {
        let mut batch_text = String::new();
        for file in &batch.files {
            batch_text.push_str(&wrap_file(file));
        }

        let messages = vec![
            ChatMessage::system(prompt::summarizer_system_prompt()),
            ChatMessage::user(prompt::build_summary_prompt(
                batch.index + 1,
                batch_count,
                &batch_text,
            )),
        ];

        match llm.complete(messages, false).await {
            Ok(text) => Digest {
                batch_index: batch.index,
                text,
            },
            Err(err) => {
                warn!(batch = batch.index, %err, "batch summarization failed, using placeholder");
                Digest {
                    batch_index: batch.index,
                    text: placeholder(batch, batch_count),
                }
            }
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    digests.sort_by_key(|d| d.batch_index);
    digests
}

fn placeholder(batch: &Batch, batch_count: usize) -> String {
    format!(
        "[Batch {} of {} could not be summarized; its {} files ({} ...) were not analyzed.]",
        batch.index + 1,
        batch_count,
        batch.files.len(),
        batch
            .files
            .first()
            .map(|f| f.path.as_str())
            .unwrap_or("<empty>"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gradus_core::{GradusError, NormalizedFile, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake that fails on selected batch ordinals and echoes otherwise.
    struct FlakyLlm {
        fail_on_ordinal: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Completion for FlakyLlm {
        async fn complete(&self, messages: Vec<ChatMessage>, _: bool) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let user = &messages[1].content;
            if user.contains(&format!("batch {} of", self.fail_on_ordinal)) {
                return Err(GradusError::UpstreamService("summarizer down".into()));
            }
            Ok(format!("summary: {}", user.len()))
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn batches(count: usize) -> Vec<Batch> {
        (0..count)
            .map(|index| Batch {
                index,
                files: vec![NormalizedFile {
                    path: format!("file{index}.py"),
                    text: "x".repeat(10 * (index + 1)),
                }],
            })
            .collect()
    }

    #[tokio::test]
    async fn digests_come_back_in_batch_order() {
        let llm = FlakyLlm {
            fail_on_ordinal: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let input = batches(5);
        let digests = summarize_batches(&llm, &input, 3).await;
        let indices: Vec<usize> = digests.iter().map(|d| d.batch_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn failed_batch_yields_placeholder_and_stays_included() {
        let llm = FlakyLlm {
            fail_on_ordinal: 2,
            calls: AtomicUsize::new(0),
        };
        let input = batches(3);
        let digests = summarize_batches(&llm, &input, 2).await;
        assert_eq!(digests.len(), 3, "failed batch must not be dropped");
        assert!(digests[1].text.contains("could not be summarized"));
        assert!(digests[1].text.contains("file1.py"));
        assert!(digests[0].text.starts_with("summary:"));
        assert!(digests[2].text.starts_with("summary:"));
    }

    #[tokio::test]
    async fn no_batches_no_calls() {
        let llm = FlakyLlm {
            fail_on_ordinal: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let digests = summarize_batches(&llm, &[], 4).await;
        assert!(digests.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}
