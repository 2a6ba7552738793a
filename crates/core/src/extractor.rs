use crate::error::IngestError;
use lopdf::Document;

/// Text extraction capability over uploaded PDF bytes.
///
/// Returns one string per page, in page order. Pages with no readable text
/// come back as empty strings so page indices stay aligned with the source
/// document.
pub trait PdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<String>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<String>, IngestError> {
        let document =
            Document::load_mem(pdf).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            // Some pages legitimately carry no text layer; keep them as
            // empty strings rather than shifting later page indices.
            let text = document.extract_text(&[page_no]).unwrap_or_default();
            pages.push(text);
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::{LopdfExtractor, PdfExtractor};
    use crate::error::IngestError;

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = LopdfExtractor.extract_pages(b"not a pdf at all");
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }
}
