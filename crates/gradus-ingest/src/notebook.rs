//! Jupyter notebook reconstruction.
//!
//! Notebooks arrive as JSON cell containers. Each cell becomes a delimited
//! block tagged by kind (markdown vs code) with its ordinal position, so the
//! LLM sees the narrative flow instead of raw JSON noise.

use serde::Deserialize;
use tracing::warn;

#[derive(Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// Cell source is either a list of lines or a single string, depending on
/// the tool that wrote the notebook.
#[derive(Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }
}

/// Reconstruct a notebook as tagged, ordered cell blocks.
///
/// Falls back to the raw bytes behind a warning annotation when the JSON is
/// not a valid cell container — the file is never dropped here.
pub fn format_notebook(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);

    let notebook: Notebook = match serde_json::from_str(&raw) {
        Ok(nb) => nb,
        Err(err) => {
            warn!(%err, "notebook did not parse as a cell container, passing raw content");
            return format!(
                "Error: could not parse the notebook JSON ({err}); raw content follows.\n\n{raw}"
            );
        }
    };

    let mut out = String::new();
    for (index, cell) in notebook.cells.iter().enumerate() {
        let ordinal = index + 1;
        let source = cell.source.joined();
        match cell.cell_type.as_str() {
            "markdown" => {
                out.push_str(&format!("\n--- Markdown cell {ordinal} ---\n"));
                out.push_str(&source);
                out.push_str(&format!("\n--- End markdown cell {ordinal} ---\n"));
            }
            "code" => {
                out.push_str(&format!("\n--- Code cell {ordinal} ---\n```python\n"));
                out.push_str(&source);
                out.push_str(&format!("\n```\n--- End code cell {ordinal} ---\n"));
            }
            // Raw and unknown cell kinds carry no evaluable content.
            _ => {}
        }
    }
    out
}
