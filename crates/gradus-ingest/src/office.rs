//! Office XML text extraction.
//!
//! Word-processing and presentation files are zip containers holding XML
//! parts. The text lives in `<w:t>` runs (`word/document.xml`) and `<a:t>`
//! runs (`ppt/slides/slideN.xml`); everything else in the container is
//! layout noise this pipeline does not need.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

/// Extract text from a `.docx` word-processing container.
///
/// Failures degrade to a diagnostic string; this never raises.
pub fn extract_docx(bytes: &[u8]) -> String {
    match docx_text(bytes) {
        Ok(text) => text,
        Err(detail) => {
            warn!(%detail, "could not extract text from document");
            format!("Error: could not extract text from the document ({detail}); it may be corrupt or unsupported.")
        }
    }
}

/// Extract text from a `.pptx` presentation container, slides concatenated
/// in slide order.
///
/// Failures degrade to a diagnostic string; this never raises.
pub fn extract_pptx(bytes: &[u8]) -> String {
    match pptx_text(bytes) {
        Ok(text) => text,
        Err(detail) => {
            warn!(%detail, "could not extract text from presentation");
            format!("Error: could not extract text from the presentation ({detail}); it may be corrupt or unsupported.")
        }
    }
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut container =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a zip container: {e}"))?;
    let xml = read_part(&mut container, "word/document.xml")?;
    Ok(text_runs(&xml, b"w:t"))
}

fn pptx_text(bytes: &[u8]) -> Result<String, String> {
    let mut container =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a zip container: {e}"))?;

    // Collect slide parts and order them numerically: slide10.xml sorts
    // after slide2.xml.
    let mut slides: Vec<(u32, String)> = container
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut out = Vec::new();
    for (_, name) in &slides {
        let xml = read_part(&mut container, name)?;
        out.push(text_runs(&xml, b"a:t"));
    }
    Ok(out.join("\n\n").trim().to_string())
}

fn read_part(
    container: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<String, String> {
    let mut part = container
        .by_name(name)
        .map_err(|e| format!("missing part '{name}': {e}"))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format!("unreadable part '{name}': {e}"))?;
    Ok(xml)
}

/// Collect the character content of every `tag` element in an XML part.
fn text_runs(xml: &str, tag: &[u8]) -> String {
    let mut reader = Reader::from_str(xml);
    let mut depth_inside = 0usize;
    let mut out = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == tag => depth_inside += 1,
            Ok(Event::End(e)) if e.name().as_ref() == tag => {
                depth_inside = depth_inside.saturating_sub(1);
            }
            Ok(Event::Text(t)) if depth_inside > 0 => {
                if let Ok(text) = t.unescape() {
                    out.push_str(&text);
                    out.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                warn!(%err, "XML parse error while extracting text runs");
                break;
            }
            _ => {}
        }
    }

    out.trim().to_string()
}
