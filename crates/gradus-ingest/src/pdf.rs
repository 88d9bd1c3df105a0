//! PDF text extraction.

use tracing::warn;

/// Extract page-ordered text from a PDF, with paragraph breaks between
/// pages.
///
/// A corrupted document yields a diagnostic string instead of an error; a
/// single unreadable page yields an inline marker and the remaining pages
/// are still extracted.
pub fn extract_text(bytes: &[u8]) -> String {
    let document = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(%err, "could not load PDF document");
            return format!(
                "Error: could not extract text from the PDF ({err}); it may be corrupt or unsupported."
            );
        }
    };

    let mut pages: Vec<String> = Vec::new();
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => pages.push(text.trim().to_string()),
            Err(err) => {
                warn!(page = page_number, %err, "could not extract text from page");
                pages.push(format!("[page {page_number}: text extraction failed]"));
            }
        }
    }

    pages.join("\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_bytes_yield_diagnostic() {
        let text = extract_text(b"%PDF-1.7 truncated nonsense");
        assert!(text.starts_with("Error: could not extract text from the PDF"));
    }

    #[test]
    fn empty_input_yields_diagnostic() {
        let text = extract_text(b"");
        assert!(text.starts_with("Error:"));
    }
}
