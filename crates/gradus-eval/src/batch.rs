//! Character-budgeted batching.
//!
//! A greedy single pass over the files in listing order. Sizes are measured
//! on the *serialized* form (content plus the per-file wrapper the prompts
//! use), so a batch's measured size is exactly what the LLM will receive.

use gradus_core::{Batch, NormalizedFile};

/// Wrap one file the way every prompt embeds it.
///
/// # Examples
///
/// ```
/// use gradus_core::NormalizedFile;
/// use gradus_eval::batch::wrap_file;
///
/// let file = NormalizedFile { path: "a.py".into(), text: "x = 1".into() };
/// let wrapped = wrap_file(&file);
/// assert!(wrapped.contains("--- FILE: a.py ---"));
/// assert!(wrapped.contains("x = 1"));
/// assert!(wrapped.contains("--- END FILE: a.py ---"));
/// ```
pub fn wrap_file(file: &NormalizedFile) -> String {
    format!(
        "\n--- FILE: {path} ---\n```\n{text}\n```\n--- END FILE: {path} ---\n",
        path = file.path,
        text = file.text,
    )
}

/// Serialized size of one file, wrapper included.
pub fn wrapped_len(file: &NormalizedFile) -> usize {
    wrap_file(file).len()
}

/// Combined serialized size of a file list.
pub fn total_wrapped_len(files: &[NormalizedFile]) -> usize {
    files.iter().map(wrapped_len).sum()
}

/// Partition files into batches of at most `budget` serialized characters.
///
/// Greedy single pass in listing order: when adding a file would exceed the
/// budget and the current batch is non-empty, the batch is closed and the
/// file starts the next one. A file larger than the whole budget still
/// becomes its own batch; files are never split.
///
/// The result is a partition: no file is duplicated or dropped, and order
/// is preserved within and across batches.
///
/// # Examples
///
/// ```
/// use gradus_core::NormalizedFile;
/// use gradus_eval::batch::{partition, wrapped_len};
///
/// let files: Vec<NormalizedFile> = (0..4)
///     .map(|i| NormalizedFile { path: format!("f{i}.py"), text: "x".repeat(100) })
///     .collect();
/// let per_file = wrapped_len(&files[0]);
///
/// let batches = partition(files, per_file * 2);
/// assert_eq!(batches.len(), 2);
/// assert_eq!(batches[0].files.len(), 2);
/// ```
pub fn partition(files: Vec<NormalizedFile>, budget: usize) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut current: Vec<NormalizedFile> = Vec::new();
    let mut current_size = 0usize;

    for file in files {
        let size = wrapped_len(&file);
        if !current.is_empty() && current_size + size > budget {
            batches.push(Batch {
                index: batches.len(),
                files: std::mem::take(&mut current),
            });
            current_size = 0;
        }
        current_size += size;
        current.push(file);
    }
    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            files: current,
        });
    }

    batches
}
