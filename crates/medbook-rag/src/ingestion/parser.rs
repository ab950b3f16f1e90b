//! Page-aware PDF text extraction

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Page;

/// Loads a PDF into one `Page` per PDF page
pub struct PdfLoader;

impl PdfLoader {
    /// Load a PDF from disk.
    ///
    /// Fails with `Error::FileNotFound` when the path does not exist.
    pub fn load(path: &Path) -> Result<Vec<Page>> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let data = std::fs::read(path)?;
        Self::load_mem(&filename, &data)
    }

    /// Extract pages from an in-memory PDF
    pub fn load_mem(filename: &str, data: &[u8]) -> Result<Vec<Page>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::pdf_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (page_num, _) in doc.get_pages() {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) => cleanup_pdf_text(&text),
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_num, e);
                    String::new()
                }
            };
            pages.push(Page::new(page_num.saturating_sub(1), text));
        }

        if pages.iter().all(|p| p.content.trim().is_empty()) {
            tracing::warn!("Page-level extraction produced no text, trying pdf-extract");
            let text = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::pdf_parse(filename, e.to_string()))?;
            let text = cleanup_pdf_text(&text);

            if text.trim().is_empty() {
                return Err(Error::pdf_parse(
                    filename,
                    "PDF appears to be image-based or has no extractable text",
                ));
            }
            return Ok(vec![Page::new(0, text)]);
        }

        Ok(pages)
    }
}

/// Normalize PDF glyph artifacts: ligatures, typographic punctuation,
/// NUL bytes and trailing whitespace.
pub fn cleanup_pdf_text(text: &str) -> String {
    let replaced = text
        .replace('\0', "")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ");

    replaced
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = PdfLoader::load(Path::new("definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = PdfLoader::load_mem("book.pdf", b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::PdfParse { .. }));
    }

    #[test]
    fn test_cleanup_ligatures_and_quotes() {
        let raw = "\u{FB01}brosis \u{201C}acute\u{201D}\u{00A0}phase\0  \n\u{2022}item   ";
        assert_eq!(cleanup_pdf_text(raw), "fibrosis \"acute\" phase\n* item");
    }
}
